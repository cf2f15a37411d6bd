use std::path::Path;

use chrono::Utc;
use inquire::validator::Validation;
use inquire::{Password, Text};

use crate::auth::hash_password;
use crate::server::validation::{validate_email, validate_password, validate_username};
use crate::store::Store;
use crate::types::User;

use super::{init_store, load_settings};

fn prompt_username() -> anyhow::Result<String> {
    Ok(Text::new("Username:")
        .with_validator(|input: &str| {
            Ok(validate_username(input.trim())
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.into())))
        })
        .prompt()?)
}

fn prompt_password() -> anyhow::Result<String> {
    Ok(Password::new("Password:")
        .with_validator(|input: &str| {
            Ok(validate_password(input)
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.into())))
        })
        .prompt()?)
}

fn required(value: Option<String>, flag: &str, non_interactive: bool) -> anyhow::Result<Option<String>> {
    match value {
        Some(v) => Ok(Some(v)),
        None if non_interactive => anyhow::bail!("{flag} is required in non-interactive mode"),
        None => Ok(None),
    }
}

pub fn run_admin_create(
    config: &Path,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let store = init_store(&settings)?;

    let username = match required(username, "--username", non_interactive)? {
        Some(name) => name.trim().to_string(),
        None => prompt_username()?.trim().to_string(),
    };
    validate_username(&username).map_err(anyhow::Error::msg)?;

    if store.get_user_by_username(&username)?.is_some() {
        anyhow::bail!("User '{username}' already exists");
    }

    let email = match email {
        Some(email) => Some(email),
        None if non_interactive => None,
        None => Some(Text::new("Email (optional):").prompt()?),
    }
    .map(|e| e.trim().to_string())
    .filter(|e| !e.is_empty());

    if let Some(email) = &email {
        validate_email(email).map_err(anyhow::Error::msg)?;
        if store.get_user_by_email(email)?.is_some() {
            anyhow::bail!("Email '{email}' is already in use");
        }
    }

    let password = match required(password, "--password", non_interactive)? {
        Some(password) => password,
        None => prompt_password()?,
    };
    validate_password(&password).map_err(anyhow::Error::msg)?;

    let mut user = User::new(&username);
    user.email = email;
    user.is_active = true;
    user.grant_all();
    user.password = hash_password(&password, &settings.core.secret_key)?;

    store.create_user(&user)?;

    println!();
    println!("Created admin user \"{username}\" ({})", user.id);
    println!();

    Ok(())
}

pub fn run_admin_change_password(
    config: &Path,
    username: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let store = init_store(&settings)?;

    let username = match required(username, "--username", non_interactive)? {
        Some(name) => name,
        None => Text::new("Username:").prompt()?,
    };

    let Some(mut user) = store.get_user_by_username(username.trim())? else {
        anyhow::bail!("User '{}' not found", username.trim());
    };

    let password = match required(password, "--password", non_interactive)? {
        Some(password) => password,
        None => prompt_password()?,
    };
    validate_password(&password).map_err(anyhow::Error::msg)?;

    user.password = hash_password(&password, &settings.core.secret_key)?;
    user.updated_at = Utc::now();
    store.update_user(&user)?;

    println!("Password changed for \"{}\"", user.username);
    Ok(())
}

pub fn run_admin_feature(config: &Path, name: &str, enable: bool) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let store = init_store(&settings)?;

    if store.get_feature(name)?.is_none() {
        let known: Vec<String> = store.list_features()?.into_iter().map(|f| f.id).collect();
        anyhow::bail!("Unknown feature '{name}'. Known features: {}", known.join(", "));
    }

    store.set_feature(name, enable)?;

    println!(
        "Feature '{name}' {}",
        if enable { "enabled" } else { "disabled" }
    );
    Ok(())
}
