//! Package ingestion and on-disk distribution storage.

mod ingest;
mod ordering;
mod storage;

pub use ingest::{IngestOutcome, Ingestor, UploadForm, normalize_classifier};
pub use ordering::{rank_versions, recompute_order};
pub use storage::{
    PackageStorage, ScratchFile, ScratchWriter, generate_relative_path, validate_filename,
};
