use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::AdminSettings;

pub const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// The single administrator account, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    email: String,
    name: String,
    salt: String,
    /// `None` when neither a password nor a hash is configured; every login then fails.
    password_hash: Option<String>,
}

impl AdminCredentials {
    pub fn from_settings(settings: &AdminSettings) -> Self {
        let password_hash = settings
            .password_hash
            .clone()
            .or_else(|| settings.password.as_deref().map(|p| hash_password(p, &settings.salt)));

        if password_hash.is_none() {
            tracing::warn!("no admin password configured, logins are disabled");
        }

        Self {
            email: settings.email.clone(),
            name: settings.name.clone(),
            salt: settings.salt.clone(),
            password_hash,
        }
    }

    /// Check a login attempt. The password is hashed whatever the email, so
    /// timing does not reveal whether the account exists.
    pub fn verify_login(&self, email: &str, password: &str) -> Option<LoginUser> {
        let candidate = hash_password(password, &self.salt);
        let email_matches = email.trim().eq_ignore_ascii_case(&self.email);

        let hash_matches = match &self.password_hash {
            Some(stored) => bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())),
            None => false,
        };

        if email_matches && hash_matches {
            Some(LoginUser {
                id: "1".into(),
                email: self.email.clone(),
                name: self.name.clone(),
                role: "admin".into(),
            })
        } else {
            None
        }
    }
}

/// PBKDF2-HMAC-SHA256, hex encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut out);
    hex::encode(out)
}
