use crate::server::response::ApiError;

const MIN_USERNAME_LEN: usize = 5;
const MAX_USERNAME_LEN: usize = 20;
const MIN_PASSWORD_LEN: usize = 5;
const MAX_PASSWORD_LEN: usize = 20;

fn is_valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        ));
    }
    if !username.chars().all(is_valid_username_char) {
        return Err(
            "Username can only contain alphanumeric characters, hyphens, underscores, and periods"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(format!(
            "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || format!("Invalid email address: {email}");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

pub fn check_username(username: &str) -> Result<(), ApiError> {
    validate_username(username).map_err(ApiError::bad_request)
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    validate_password(password).map_err(ApiError::bad_request)
}

pub fn check_email(email: &str) -> Result<(), ApiError> {
    validate_email(email).map_err(ApiError::bad_request)
}
