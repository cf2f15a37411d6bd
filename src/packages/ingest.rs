use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::ordering::recompute_order;
use super::storage::{PackageStorage, ScratchFile, generate_relative_path, validate_filename};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{FEATURE_AUTO_MAINTAINERS, Package, User, Version, VersionFile};

/// Metadata fields of a distutils/twine upload.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub description: String,
    pub home_page: String,
    pub comment: String,
    pub license: String,
    pub author_email: String,
    pub maintainer_email: String,
    pub classifiers: Vec<String>,
    pub sha256_digest: Option<String>,
    /// Client-side name of the uploaded distribution file.
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub package: Package,
    pub version: Version,
    pub file: VersionFile,
    pub created_package: bool,
    pub created_version: bool,
}

/// Turns an authenticated upload into package, version and file records
/// plus the stored distribution file.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn Store>,
    storage: PackageStorage,
}

impl Ingestor {
    pub fn new(store: Arc<dyn Store>, storage: PackageStorage) -> Self {
        Self { store, storage }
    }

    /// The scratch file is consumed and removed whatever the outcome.
    pub async fn ingest(
        &self,
        user: &User,
        form: &UploadForm,
        scratch: ScratchFile,
    ) -> Result<IngestOutcome> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(Error::validation("invalid name"));
        }
        let version_string = form.version.trim();
        if version_string.is_empty() {
            return Err(Error::validation("invalid version"));
        }
        validate_filename(&form.filename)?;

        if let Some(expected) = form.sha256_digest.as_deref().map(str::trim) {
            if !expected.is_empty() && !expected.eq_ignore_ascii_case(scratch.sha256_digest()) {
                return Err(Error::validation("sha256 digest does not match upload"));
            }
        }

        let (package, created_package) = self.resolve_package(user, name)?;
        let (version, created_version) = self.resolve_version(user, &package, version_string, form)?;

        if self.store.is_feature_enabled(FEATURE_AUTO_MAINTAINERS)? {
            self.assign_maintainers(&package, form)?;
        }

        let file = self.store_file(user, &version, &form.filename, &scratch).await?;

        tracing::info!(
            package = %package.name,
            version = %version.version,
            filename = %file.filename,
            user = %user.username,
            "Accepted upload"
        );

        Ok(IngestOutcome {
            package,
            version,
            file,
            created_package,
            created_version,
        })
    }

    fn resolve_package(&self, user: &User, name: &str) -> Result<(Package, bool)> {
        if let Some(existing) = self.store.get_package_by_name(name)? {
            self.authorize_existing(user, &existing)?;
            return Ok((existing, false));
        }

        if !user.can_create {
            return Err(Error::forbidden("missing create permission"));
        }

        let package = Package::new(name, &user.id);
        match self.store.create_package(&package) {
            Ok(()) => {
                tracing::info!(package = %package.name, "Created package");
                Ok((package, true))
            }
            Err(Error::AlreadyExists) => {
                let existing = self
                    .store
                    .get_package_by_name(name)?
                    .ok_or(Error::Missing("package"))?;
                self.authorize_existing(user, &existing)?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    fn authorize_existing(&self, user: &User, package: &Package) -> Result<()> {
        if package.author_id == user.id {
            return Ok(());
        }
        if user.can_update && self.store.is_maintainer(&package.id, &user.id)? {
            return Ok(());
        }
        Err(Error::forbidden("not maintainer"))
    }

    fn resolve_version(
        &self,
        user: &User,
        package: &Package,
        version_string: &str,
        form: &UploadForm,
    ) -> Result<(Version, bool)> {
        if let Some(existing) = self
            .store
            .get_version_by_string(&package.id, version_string)?
        {
            return Ok((existing, false));
        }

        let mut version = Version::new(&package.id, version_string, &user.id);
        version.summary = form.summary.trim().to_string();
        version.description = form.description.trim().to_string();
        version.home_page = form.home_page.trim().to_string();
        version.comment = form.comment.trim().to_string();

        let license = form.license.trim();
        if !license.is_empty() {
            version.license_id = Some(self.store.get_or_create_license(license)?.id);
        }

        let mut classifier_ids = Vec::new();
        for raw in &form.classifiers {
            let Some(name) = normalize_classifier(raw) else {
                continue;
            };
            let classifier = self.store.get_or_create_classifier(&name)?;
            if !classifier_ids.contains(&classifier.id) {
                classifier_ids.push(classifier.id);
            }
        }

        match self.store.create_version(&version) {
            Ok(()) => {
                self.store
                    .set_version_classifiers(&version.id, &classifier_ids)?;
                recompute_order(self.store.as_ref(), &package.id)?;
                let version = self
                    .store
                    .get_version(&version.id)?
                    .ok_or(Error::Missing("version"))?;
                tracing::info!(
                    package = %package.name,
                    version = %version.version,
                    order = version.version_order,
                    "Created version"
                );
                Ok((version, true))
            }
            Err(Error::AlreadyExists) => {
                let existing = self
                    .store
                    .get_version_by_string(&package.id, version_string)?
                    .ok_or(Error::Missing("version"))?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    fn assign_maintainers(&self, package: &Package, form: &UploadForm) -> Result<()> {
        for email in [&form.author_email, &form.maintainer_email] {
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            if let Some(user) = self.store.get_user_by_email(email)? {
                self.store.add_maintainer(&package.id, &user.id)?;
                tracing::debug!(package = %package.name, user = %user.username, "Added maintainer");
            }
        }
        Ok(())
    }

    async fn store_file(
        &self,
        user: &User,
        version: &Version,
        filename: &str,
        scratch: &ScratchFile,
    ) -> Result<VersionFile> {
        if self.store.get_version_file(&version.id, filename)?.is_some() {
            return Err(Error::forbidden("file already exists"));
        }

        let file = VersionFile {
            id: Uuid::new_v4().to_string(),
            version_id: version.id.clone(),
            filename: filename.to_string(),
            relative_path: generate_relative_path(),
            sha256_digest: scratch.sha256_digest().to_string(),
            size: i64::try_from(scratch.size())
                .map_err(|_| Error::validation("upload too large"))?,
            author_id: user.id.clone(),
            created_at: Utc::now(),
        };

        self.storage
            .commit(scratch, &file.relative_path, &file.filename)
            .await?;

        match self.store.create_version_file(&file) {
            Ok(()) => Ok(file),
            Err(Error::AlreadyExists) => Err(Error::forbidden("file already exists")),
            Err(e) => Err(e),
        }
    }
}

/// Canonical classifier text: `::`-separated segments, trimmed, empty
/// segments dropped, joined with ` :: `.
#[must_use]
pub fn normalize_classifier(raw: &str) -> Option<String> {
    let segments: Vec<&str> = raw
        .split("::")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" :: "))
    }
}
