use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::Params;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

const ALGORITHM: &str = "scrypt";
const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;
const SALT_LEN: usize = 32;
const KEY_LEN: usize = 128;
/// Records claiming more work than this are treated as unverifiable.
const MAX_LOG_N: u32 = 24;

pub const DEFAULT_ITERATIONS: u32 = 16384;

/// Produces `scrypt$<iterations>$<salt>$<hash>` credential records.
///
/// The secret key is appended to the salt before derivation, so records only
/// verify under the secret they were created with.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PasswordHasher {
    /// `iterations` must be a power of two greater than one.
    pub fn with_iterations(iterations: u32) -> Result<Self> {
        if log_n(iterations).is_none() {
            return Err(Error::Config(format!(
                "scrypt iterations must be a power of two, got {iterations}"
            )));
        }
        Ok(Self { iterations })
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn hash(&self, password: &str, secret: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = derive(password, &salt, secret, self.iterations)
            .ok_or_else(|| Error::Config("failed to derive password key".to_string()))?;

        Ok(format!(
            "{ALGORITHM}${}${}${}",
            self.iterations,
            STANDARD.encode(salt),
            STANDARD.encode(key)
        ))
    }
}

/// Hashes with the default parameters.
pub fn hash_password(password: &str, secret: &str) -> Result<String> {
    PasswordHasher::default().hash(password, secret)
}

/// Checks `password` against a stored record. Any record that cannot be
/// parsed fails verification.
#[must_use]
pub fn verify_password(record: &str, password: &str, secret: &str) -> bool {
    let record = record.trim();
    if record.is_empty() {
        return false;
    }

    let parts: Vec<&str> = record.split('$').collect();
    let [algorithm, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *algorithm != ALGORITHM {
        return false;
    }

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = STANDARD.decode(salt) else {
        return false;
    };
    let Some(key) = derive(password, &salt, secret, iterations) else {
        return false;
    };

    let computed = STANDARD.encode(key);
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn log_n(iterations: u32) -> Option<u8> {
    if iterations <= 1 || !iterations.is_power_of_two() {
        return None;
    }
    let log_n = iterations.trailing_zeros();
    if log_n > MAX_LOG_N {
        return None;
    }
    u8::try_from(log_n).ok()
}

fn derive(password: &str, salt: &[u8], secret: &str, iterations: u32) -> Option<Vec<u8>> {
    let params = Params::new(
        log_n(iterations)?,
        BLOCK_SIZE,
        PARALLELISM,
        Params::RECOMMENDED_LEN,
    )
    .ok()?;

    let mut salted = Vec::with_capacity(salt.len() + secret.len());
    salted.extend_from_slice(salt);
    salted.extend_from_slice(secret.as_bytes());

    let mut key = vec![0u8; KEY_LEN];
    scrypt::scrypt(password.as_bytes(), &salted, &params, &mut key).ok()?;
    Some(key)
}
