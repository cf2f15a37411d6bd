//! # Wheelhouse
//!
//! A private Python package index, usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! wheelhouse = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wheelhouse::config::Settings;
//! use wheelhouse::server::{AppState, create_router};
//! use wheelhouse::store::{SqliteStore, Store};
//!
//! let settings = Settings::load("wheelhouse.toml".as_ref()).unwrap();
//! let store = SqliteStore::new(&settings.database.path).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), settings));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod packages;
pub mod server;
pub mod stats;
pub mod store;
pub mod types;
