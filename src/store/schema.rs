pub const SCHEMA: &str = r#"
-- Users authenticate with a scrypt credential record and carry capability flags
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT UNIQUE,                -- NULL = no email, multiple NULLs allowed
    password TEXT NOT NULL DEFAULT '', -- empty = unusable password
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 0,
    is_admin INTEGER NOT NULL DEFAULT 0,
    can_list INTEGER NOT NULL DEFAULT 0,
    can_create INTEGER NOT NULL DEFAULT 0,
    can_download INTEGER NOT NULL DEFAULT 0,
    can_update INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Packages are created on the first accepted upload under a name
CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS package_maintainers (
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (package_id, user_id)
);

CREATE TABLE IF NOT EXISTS licenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    approved INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS classifiers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    approved INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS platforms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

-- One row per (package, version string); version_order is the semver rank
CREATE TABLE IF NOT EXISTS versions (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    version TEXT NOT NULL,
    version_order INTEGER NOT NULL DEFAULT 0,
    summary TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    home_page TEXT NOT NULL DEFAULT '',
    comment TEXT NOT NULL DEFAULT '',
    license_id INTEGER REFERENCES licenses(id) ON DELETE SET NULL,
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(package_id, version)
);

CREATE TABLE IF NOT EXISTS version_classifiers (
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    classifier_id INTEGER NOT NULL REFERENCES classifiers(id) ON DELETE CASCADE,
    PRIMARY KEY (version_id, classifier_id)
);

-- Distribution files; relative_path is random, never derived from filename
CREATE TABLE IF NOT EXISTS version_files (
    id TEXT PRIMARY KEY,
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    filename TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    sha256_digest TEXT NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(version_id, filename)
);

CREATE TABLE IF NOT EXISTS features (
    id TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    value INTEGER NOT NULL DEFAULT 0
);

-- Download rollups; bucket is the aligned UTC start of the period (RFC 3339)
CREATE TABLE IF NOT EXISTS download_stats_weekly (
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    bucket TEXT NOT NULL,
    downloads INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (version_id, bucket)
);

CREATE TABLE IF NOT EXISTS download_stats_monthly (
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    bucket TEXT NOT NULL,
    downloads INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (version_id, bucket)
);

-- Yearly rows are never pruned and hold the all-time totals
CREATE TABLE IF NOT EXISTS download_stats_yearly (
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    bucket TEXT NOT NULL,
    downloads INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (version_id, bucket)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_packages_author ON packages(author_id);
CREATE INDEX IF NOT EXISTS idx_maintainers_user ON package_maintainers(user_id);
CREATE INDEX IF NOT EXISTS idx_versions_package ON versions(package_id);
CREATE INDEX IF NOT EXISTS idx_version_files_version ON version_files(version_id);
CREATE INDEX IF NOT EXISTS idx_version_files_path ON version_files(relative_path, filename);
CREATE INDEX IF NOT EXISTS idx_stats_weekly_bucket ON download_stats_weekly(bucket);
CREATE INDEX IF NOT EXISTS idx_stats_monthly_bucket ON download_stats_monthly(bucket);
CREATE INDEX IF NOT EXISTS idx_stats_yearly_bucket ON download_stats_yearly(bucket);
"#;
