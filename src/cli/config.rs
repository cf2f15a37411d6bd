use std::fs;
use std::path::{Path, PathBuf};

use inquire::{CustomType, Text};

use crate::config::Settings;

use super::{init_store, load_settings};

pub fn run_make_config(output: PathBuf, non_interactive: bool) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing file {}", output.display());
    }

    let mut settings = Settings::generate();

    if !non_interactive {
        settings.core.listen = Text::new("Listen address:")
            .with_default(&settings.core.listen)
            .prompt()?;

        let database = Text::new("Database path:")
            .with_default(&settings.database.path.to_string_lossy())
            .prompt()?;
        settings.database.path = database.into();

        let packages = Text::new("Package directory:")
            .with_default(&settings.packages.directory.to_string_lossy())
            .prompt()?;
        settings.packages.directory = packages.into();

        settings.core.token_ttl_seconds = CustomType::<i64>::new("Token lifetime in seconds:")
            .with_default(settings.core.token_ttl_seconds)
            .prompt()?;
    }

    settings.validate()?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, settings.to_toml()?)?;

    #[cfg(unix)]
    set_restrictive_permissions(&output);

    println!("Wrote configuration to {}", output.display());
    Ok(())
}

pub fn run_migrate(config: &Path) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    init_store(&settings)?;

    println!(
        "Database ready at {}",
        settings.database.path.display()
    );
    Ok(())
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}
