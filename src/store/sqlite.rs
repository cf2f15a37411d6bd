use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::stats::{Granularity, StatsFilter};
use crate::types::*;

const USER_COLUMNS: &str = "id, username, email, password, first_name, last_name, is_active, \
     is_admin, can_list, can_create, can_download, can_update, created_at, updated_at";

const PACKAGE_COLUMNS: &str = "id, name, author_id, created_at, updated_at";

const VERSION_COLUMNS: &str = "id, package_id, version, version_order, summary, description, \
     home_page, comment, license_id, author_id, created_at, updated_at";

const FILE_COLUMNS: &str =
    "id, version_id, filename, relative_path, sha256_digest, size, author_id, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Buckets and retention cutoffs share one fixed-width format so that text
/// comparison in SQL matches chronological order.
fn format_bucket(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn insert_result(result: rusqlite::Result<usize>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
        Err(e) => Err(Error::from(e)),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        is_active: row.get(6)?,
        is_admin: row.get(7)?,
        can_list: row.get(8)?,
        can_create: row.get(9)?,
        can_download: row.get(10)?,
        can_update: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
    })
}

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        name: row.get(1)?,
        author_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: row.get(0)?,
        package_id: row.get(1)?,
        version: row.get(2)?,
        version_order: row.get(3)?,
        summary: row.get(4)?,
        description: row.get(5)?,
        home_page: row.get(6)?,
        comment: row.get(7)?,
        license_id: row.get(8)?,
        author_id: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<VersionFile> {
    Ok(VersionFile {
        id: row.get(0)?,
        version_id: row.get(1)?,
        filename: row.get(2)?,
        relative_path: row.get(3)?,
        sha256_digest: row.get(4)?,
        size: row.get(5)?,
        author_id: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn license_from_row(row: &Row<'_>) -> rusqlite::Result<License> {
    Ok(License {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        approved: row.get(4)?,
    })
}

fn platform_from_row(row: &Row<'_>) -> rusqlite::Result<Platform> {
    Ok(Platform {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        description: row.get(1)?,
        value: row.get(2)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        for (id, description) in DEFAULT_FEATURES {
            conn.execute(
                "INSERT INTO features (id, description, value) VALUES (?1, ?2, 0)
                 ON CONFLICT (id) DO UPDATE SET description = excluded.description",
                params![id, description],
            )?;
        }
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, username, email, password, first_name, last_name, is_active,
                                is_admin, can_list, can_create, can_download, can_update,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                user.id,
                user.username,
                user.email,
                user.password,
                user.first_name,
                user.last_name,
                user.is_active,
                user.is_admin,
                user.can_list,
                user.can_create,
                user.can_download,
                user.can_update,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );
        insert_result(result)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username > ?1 ORDER BY username LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE users SET username = ?1, email = ?2, password = ?3, first_name = ?4,
                 last_name = ?5, is_active = ?6, is_admin = ?7, can_list = ?8, can_create = ?9,
                 can_download = ?10, can_update = ?11, updated_at = ?12
             WHERE id = ?13",
            params![
                user.username,
                user.email,
                user.password,
                user.first_name,
                user.last_name,
                user.is_active,
                user.is_admin,
                user.can_list,
                user.can_create,
                user.can_download,
                user.can_update,
                format_datetime(&user.updated_at),
                user.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::Missing("user")),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn count_active_users(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Package operations

    fn create_package(&self, package: &Package) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO packages (id, name, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                package.id,
                package.name,
                package.author_id,
                format_datetime(&package.created_at),
                format_datetime(&package.updated_at),
            ],
        );
        insert_result(result)
    }

    fn get_package(&self, id: &str) -> Result<Option<Package>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1"),
            params![id],
            package_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_package_by_name(&self, name: &str) -> Result<Option<Package>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE name = ?1"),
            params![name],
            package_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_packages(
        &self,
        search: Option<&str>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Package>> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages
             WHERE name > ?1 AND (?2 IS NULL OR name LIKE ?2)
             ORDER BY name LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![cursor, pattern, limit], package_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_packages(&self, user_id: &str) -> Result<Vec<Package>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages
             WHERE author_id = ?1
                OR id IN (SELECT package_id FROM package_maintainers WHERE user_id = ?1)
             ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![user_id], package_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_packages(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count)
    }

    // Package-Maintainer M2M operations

    fn add_maintainer(&self, package_id: &str, user_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO package_maintainers (package_id, user_id) VALUES (?1, ?2)",
            params![package_id, user_id],
        )?;
        Ok(())
    }

    fn remove_maintainer(&self, package_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM package_maintainers WHERE package_id = ?1 AND user_id = ?2",
            params![package_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn list_maintainers(&self, package_id: &str) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE id IN (SELECT user_id FROM package_maintainers WHERE package_id = ?1)
             ORDER BY username"
        ))?;

        let rows = stmt.query_map(params![package_id], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn is_maintainer(&self, package_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM package_maintainers WHERE package_id = ?1 AND user_id = ?2",
            params![package_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Version operations

    fn create_version(&self, version: &Version) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO versions (id, package_id, version, version_order, summary, description,
                                   home_page, comment, license_id, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                version.id,
                version.package_id,
                version.version,
                version.version_order,
                version.summary,
                version.description,
                version.home_page,
                version.comment,
                version.license_id,
                version.author_id,
                format_datetime(&version.created_at),
                format_datetime(&version.updated_at),
            ],
        );
        insert_result(result)
    }

    fn get_version(&self, id: &str) -> Result<Option<Version>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE id = ?1"),
            params![id],
            version_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_version_by_string(&self, package_id: &str, version: &str) -> Result<Option<Version>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE package_id = ?1 AND version = ?2"),
            params![package_id, version],
            version_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_versions(&self, package_id: &str) -> Result<Vec<Version>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE package_id = ?1
             ORDER BY version_order, created_at"
        ))?;

        let rows = stmt.query_map(params![package_id], version_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn apply_version_order(&self, package_id: &str, ranks: &[(String, i64)]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE versions SET version_order = 0 WHERE package_id = ?1",
            params![package_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "UPDATE versions SET version_order = ?1 WHERE id = ?2 AND package_id = ?3",
            )?;
            for (version_id, order) in ranks {
                stmt.execute(params![order, version_id, package_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_version(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM versions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Classifier operations

    fn get_or_create_classifier(&self, name: &str) -> Result<Classifier> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO classifiers (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![name],
        )?;
        conn.query_row(
            "SELECT id, name, approved FROM classifiers WHERE name = ?1",
            params![name],
            |row| {
                Ok(Classifier {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    approved: row.get(2)?,
                })
            },
        )
        .map_err(Error::from)
    }

    fn set_version_classifiers(&self, version_id: &str, classifier_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM version_classifiers WHERE version_id = ?1",
            params![version_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO version_classifiers (version_id, classifier_id) VALUES (?1, ?2)",
            )?;
            for classifier_id in classifier_ids {
                stmt.execute(params![version_id, classifier_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_version_classifiers(&self, version_id: &str) -> Result<Vec<Classifier>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.approved FROM classifiers c
             JOIN version_classifiers vc ON vc.classifier_id = c.id
             WHERE vc.version_id = ?1
             ORDER BY c.name",
        )?;

        let rows = stmt.query_map(params![version_id], |row| {
            Ok(Classifier {
                id: row.get(0)?,
                name: row.get(1)?,
                approved: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // License operations

    fn get_or_create_license(&self, code: &str) -> Result<License> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO licenses (code) VALUES (?1) ON CONFLICT (code) DO NOTHING",
            params![code],
        )?;
        conn.query_row(
            "SELECT id, code, name, content, approved FROM licenses WHERE code = ?1",
            params![code],
            license_from_row,
        )
        .map_err(Error::from)
    }

    fn get_license(&self, id: i64) -> Result<Option<License>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, code, name, content, approved FROM licenses WHERE id = ?1",
            params![id],
            license_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_licenses(&self) -> Result<Vec<License>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, code, name, content, approved FROM licenses ORDER BY code")?;

        let rows = stmt.query_map([], license_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_license(&self, license: &License) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE licenses SET name = ?1, content = ?2, approved = ?3 WHERE id = ?4",
            params![license.name, license.content, license.approved, license.id],
        )?;

        if rows == 0 {
            return Err(Error::Missing("license"));
        }
        Ok(())
    }

    fn count_licenses(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))?;
        Ok(count)
    }

    // Platform operations

    fn get_or_create_platform(&self, name: &str) -> Result<Platform> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO platforms (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![name],
        )?;
        conn.query_row(
            "SELECT id, name, description FROM platforms WHERE name = ?1",
            params![name],
            platform_from_row,
        )
        .map_err(Error::from)
    }

    fn get_platform(&self, id: i64) -> Result<Option<Platform>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description FROM platforms WHERE id = ?1",
            params![id],
            platform_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_platforms(&self) -> Result<Vec<Platform>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, description FROM platforms ORDER BY name")?;

        let rows = stmt.query_map([], platform_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Version file operations

    fn create_version_file(&self, file: &VersionFile) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO version_files (id, version_id, filename, relative_path, sha256_digest,
                                        size, author_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file.id,
                file.version_id,
                file.filename,
                file.relative_path,
                file.sha256_digest,
                file.size,
                file.author_id,
                format_datetime(&file.created_at),
            ],
        );
        insert_result(result)
    }

    fn get_version_file(&self, version_id: &str, filename: &str) -> Result<Option<VersionFile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM version_files WHERE version_id = ?1 AND filename = ?2"),
            params![version_id, filename],
            file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_version_file_by_path(
        &self,
        relative_path: &str,
        filename: &str,
    ) -> Result<Option<VersionFile>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {FILE_COLUMNS} FROM version_files WHERE relative_path = ?1 AND filename = ?2"
            ),
            params![relative_path, filename],
            file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_version_files(&self, version_id: &str) -> Result<Vec<VersionFile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM version_files WHERE version_id = ?1 ORDER BY filename"
        ))?;

        let rows = stmt.query_map(params![version_id], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_package_files(&self, package_id: &str) -> Result<Vec<VersionFile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT f.id, f.version_id, f.filename, f.relative_path, f.sha256_digest, f.size,
                    f.author_id, f.created_at
             FROM version_files f
             JOIN versions v ON v.id = f.version_id
             WHERE v.package_id = ?1
             ORDER BY f.filename",
        )?;

        let rows = stmt.query_map(params![package_id], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Feature operations

    fn get_feature(&self, id: &str) -> Result<Option<Feature>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, description, value FROM features WHERE id = ?1",
            params![id],
            feature_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_features(&self) -> Result<Vec<Feature>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, description, value FROM features ORDER BY id")?;

        let rows = stmt.query_map([], feature_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_feature(&self, id: &str, value: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE features SET value = ?1 WHERE id = ?2",
            params![value, id],
        )?;

        if rows == 0 {
            return Err(Error::Missing("feature"));
        }
        Ok(())
    }

    fn is_feature_enabled(&self, id: &str) -> Result<bool> {
        Ok(self.get_feature(id)?.is_some_and(|f| f.value))
    }

    // Download stats operations

    fn ensure_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO {} (version_id, bucket, downloads) VALUES (?1, ?2, 0)
                 ON CONFLICT (version_id, bucket) DO NOTHING",
                granularity.table()
            ),
            params![version_id, format_bucket(bucket)],
        )?;
        Ok(())
    }

    fn increment_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<()> {
        let rows = self.conn().execute(
            &format!(
                "UPDATE {} SET downloads = downloads + 1 WHERE version_id = ?1 AND bucket = ?2",
                granularity.table()
            ),
            params![version_id, format_bucket(bucket)],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn get_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT downloads FROM {} WHERE version_id = ?1 AND bucket = ?2",
                granularity.table()
            ),
            params![version_id, format_bucket(bucket)],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_download_stats_before(
        &self,
        granularity: Granularity,
        cutoff: &DateTime<Utc>,
    ) -> Result<usize> {
        let rows = self.conn().execute(
            &format!("DELETE FROM {} WHERE bucket < ?1", granularity.table()),
            params![format_bucket(cutoff)],
        )?;
        Ok(rows)
    }

    fn download_stats_series(
        &self,
        granularity: Granularity,
        filter: &StatsFilter,
    ) -> Result<Vec<StatsItem>> {
        let table = granularity.table();
        let (sql, arg) = match filter {
            StatsFilter::All => (
                format!(
                    "SELECT bucket, SUM(downloads) FROM {table}
                     WHERE ?1 IS NULL GROUP BY bucket ORDER BY bucket"
                ),
                None,
            ),
            StatsFilter::Package(package_id) => (
                format!(
                    "SELECT s.bucket, SUM(s.downloads) FROM {table} s
                     JOIN versions v ON v.id = s.version_id
                     WHERE v.package_id = ?1 GROUP BY s.bucket ORDER BY s.bucket"
                ),
                Some(package_id.as_str()),
            ),
            StatsFilter::Version(version_id) => (
                format!(
                    "SELECT bucket, SUM(downloads) FROM {table}
                     WHERE version_id = ?1 GROUP BY bucket ORDER BY bucket"
                ),
                Some(version_id.as_str()),
            ),
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![arg], |row| {
            Ok(StatsItem {
                bucket: parse_datetime(&row.get::<_, String>(0)?),
                downloads: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_download_stat_rows(&self, granularity: Granularity) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", granularity.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn total_downloads(&self) -> Result<i64> {
        let conn = self.conn();
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(downloads), 0) FROM download_stats_yearly",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_user(store: &SqliteStore, username: &str) -> User {
        let user = User::new(username);
        store.create_user(&user).unwrap();
        user
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "packages",
            "package_maintainers",
            "versions",
            "version_files",
            "classifiers",
            "version_classifiers",
            "licenses",
            "platforms",
            "features",
            "download_stats_weekly",
            "download_stats_monthly",
            "download_stats_yearly",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_seeds_features_disabled_and_is_idempotent() {
        let (_temp, store) = test_store();
        store.set_feature(FEATURE_DOWNLOAD_STATS, true).unwrap();

        store.initialize().unwrap();

        let features = store.list_features().unwrap();
        assert_eq!(features.len(), DEFAULT_FEATURES.len());
        assert!(store.is_feature_enabled(FEATURE_DOWNLOAD_STATS).unwrap());
        assert!(!store.is_feature_enabled(FEATURE_AUTO_MAINTAINERS).unwrap());
        assert!(!store.is_feature_enabled("no_such_feature").unwrap());
    }

    #[test]
    fn test_user_crud() {
        let (_temp, store) = test_store();

        let mut user = User::new("alice");
        user.email = Some("alice@example.com".to_string());
        user.is_active = true;
        user.can_create = true;
        store.create_user(&user).unwrap();

        let fetched = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert!(fetched.can_create);
        assert!(!fetched.can_update);

        let by_email = store
            .get_user_by_email("alice@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        user.first_name = "Alice".to_string();
        store.update_user(&user).unwrap();
        let by_name = store.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.first_name, "Alice");

        assert_eq!(store.count_active_users().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_username_is_already_exists() {
        let (_temp, store) = test_store();
        test_user(&store, "alice");

        let result = store.create_user(&User::new("alice"));
        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_users_without_email_do_not_collide() {
        let (_temp, store) = test_store();
        test_user(&store, "alice");
        test_user(&store, "bobby");

        let users = store.list_users("", 10).unwrap();
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_duplicate_package_name_is_already_exists() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");

        store.create_package(&Package::new("demo", &user.id)).unwrap();
        let result = store.create_package(&Package::new("demo", &user.id));
        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_foreign_key_violation_is_not_already_exists() {
        let (_temp, store) = test_store();

        let result = store.create_package(&Package::new("demo", "missing-user"));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_maintainers() {
        let (_temp, store) = test_store();
        let author = test_user(&store, "alice");
        let maintainer = test_user(&store, "bobby");
        let package = Package::new("demo", &author.id);
        store.create_package(&package).unwrap();

        assert!(!store.is_maintainer(&package.id, &maintainer.id).unwrap());
        store.add_maintainer(&package.id, &maintainer.id).unwrap();
        store.add_maintainer(&package.id, &maintainer.id).unwrap();
        assert!(store.is_maintainer(&package.id, &maintainer.id).unwrap());
        assert_eq!(store.list_maintainers(&package.id).unwrap().len(), 1);

        let mine = store.list_user_packages(&maintainer.id).unwrap();
        assert_eq!(mine.len(), 1);

        assert!(store.remove_maintainer(&package.id, &maintainer.id).unwrap());
        assert!(!store.remove_maintainer(&package.id, &maintainer.id).unwrap());
        assert!(store.list_user_packages(&maintainer.id).unwrap().is_empty());
        assert_eq!(store.list_user_packages(&author.id).unwrap().len(), 1);
    }

    #[test]
    fn test_list_packages_search_and_cursor() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");
        for name in ["alpha", "beta", "alphabet"] {
            store.create_package(&Package::new(name, &user.id)).unwrap();
        }

        let all = store.list_packages(None, "", 10).unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "alphabet", "beta"]);

        let searched = store.list_packages(Some("alpha"), "", 10).unwrap();
        assert_eq!(searched.len(), 2);

        let page = store.list_packages(None, "alpha", 10).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "alphabet");
    }

    #[test]
    fn test_duplicate_version_and_file_are_already_exists() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");
        let package = Package::new("demo", &user.id);
        store.create_package(&package).unwrap();

        let version = Version::new(&package.id, "1.0.0", &user.id);
        store.create_version(&version).unwrap();
        let duplicate = Version::new(&package.id, "1.0.0", &user.id);
        assert!(matches!(
            store.create_version(&duplicate),
            Err(Error::AlreadyExists)
        ));

        let file = VersionFile {
            id: "file-1".to_string(),
            version_id: version.id.clone(),
            filename: "demo-1.0.0.tar.gz".to_string(),
            relative_path: "ab/abcd/ef".to_string(),
            sha256_digest: "00".to_string(),
            size: 3,
            author_id: user.id.clone(),
            created_at: Utc::now(),
        };
        store.create_version_file(&file).unwrap();

        let again = VersionFile {
            id: "file-2".to_string(),
            ..file.clone()
        };
        assert!(matches!(
            store.create_version_file(&again),
            Err(Error::AlreadyExists)
        ));

        let by_path = store
            .get_version_file_by_path("ab/abcd/ef", "demo-1.0.0.tar.gz")
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, "file-1");
        assert_eq!(store.list_package_files(&package.id).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_version_order_resets_stale_ranks() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");
        let package = Package::new("demo", &user.id);
        store.create_package(&package).unwrap();

        let a = Version::new(&package.id, "1.0.0", &user.id);
        let b = Version::new(&package.id, "2.0.0", &user.id);
        store.create_version(&a).unwrap();
        store.create_version(&b).unwrap();

        store
            .apply_version_order(&package.id, &[(a.id.clone(), 1), (b.id.clone(), 2)])
            .unwrap();
        store
            .apply_version_order(&package.id, &[(b.id.clone(), 1)])
            .unwrap();

        assert_eq!(store.get_version(&a.id).unwrap().unwrap().version_order, 0);
        assert_eq!(store.get_version(&b.id).unwrap().unwrap().version_order, 1);
    }

    #[test]
    fn test_lookup_tables_get_or_create() {
        let (_temp, store) = test_store();

        let mit = store.get_or_create_license("MIT").unwrap();
        let again = store.get_or_create_license("MIT").unwrap();
        assert_eq!(mit.id, again.id);
        assert_eq!(store.count_licenses().unwrap(), 1);

        let linux = store.get_or_create_platform("Linux").unwrap();
        assert_eq!(store.get_platform(linux.id).unwrap().unwrap().name, "Linux");

        let c1 = store.get_or_create_classifier("Language :: Rust").unwrap();
        let c2 = store.get_or_create_classifier("Language :: Rust").unwrap();
        assert_eq!(c1.id, c2.id);
    }

    #[test]
    fn test_download_stat_upsert_and_increment() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");
        let package = Package::new("demo", &user.id);
        store.create_package(&package).unwrap();
        let version = Version::new(&package.id, "1.0.0", &user.id);
        store.create_version(&version).unwrap();

        let bucket = Utc.with_ymd_and_hms(2016, 10, 31, 0, 0, 0).unwrap();
        for _ in 0..3 {
            store
                .ensure_download_stat(Granularity::Weekly, &version.id, &bucket)
                .unwrap();
            store
                .increment_download_stat(Granularity::Weekly, &version.id, &bucket)
                .unwrap();
        }

        assert_eq!(
            store
                .get_download_stat(Granularity::Weekly, &version.id, &bucket)
                .unwrap(),
            Some(3)
        );
        assert_eq!(store.count_download_stat_rows(Granularity::Weekly).unwrap(), 1);

        let series = store
            .download_stats_series(Granularity::Weekly, &StatsFilter::Package(package.id))
            .unwrap();
        assert_eq!(
            series,
            vec![StatsItem {
                bucket,
                downloads: 3
            }]
        );
    }

    #[test]
    fn test_increment_missing_row_is_not_found() {
        let (_temp, store) = test_store();
        let bucket = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();

        let result = store.increment_download_stat(Granularity::Yearly, "missing", &bucket);
        assert!(matches!(result, Err(Error::NotFound)));
    }
}
