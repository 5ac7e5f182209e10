use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};

use super::validation::ValidRow;

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%&*";

/// A validated row plus its synthetic credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedUser {
    pub full_name: String,
    pub postal_code: String,
    pub birthday: String,
    pub generated_email: String,
    pub generated_password: String,
}

/// Lowercased ASCII words of `name` joined with `.`.
pub fn email_local_part(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
}

pub fn generate_email(name: &str, domain: &str) -> String {
    format!("{}@{}", email_local_part(name), domain)
}

/// Uniform draw from the password charset using the OS CSPRNG.
pub fn generate_password(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

pub fn generate_users(rows: &[ValidRow], domain: &str, password_length: usize) -> Vec<GeneratedUser> {
    rows.iter()
        .map(|row| GeneratedUser {
            full_name: row.name.clone(),
            postal_code: row.postal_code.clone(),
            birthday: row.birthday.to_string(),
            generated_email: generate_email(&row.name, domain),
            generated_password: generate_password(password_length),
        })
        .collect()
}
