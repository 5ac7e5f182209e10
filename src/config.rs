use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Limits and knobs for the CSV import pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub max_rows: usize,
    pub max_bytes: usize,
    pub email_domain: String,
    pub password_length: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            max_bytes: 1024 * 1024,
            email_domain: "company.com".into(),
            password_length: 12,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub import: ImportConfig,
    /// Accounts registered with one of these emails are granted the admin role.
    pub admin_emails: Vec<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "user-import".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "user-import-admins".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let defaults = ImportConfig::default();
        let import = ImportConfig {
            max_rows: env_or("IMPORT_MAX_ROWS", defaults.max_rows),
            max_bytes: env_or("IMPORT_MAX_BYTES", defaults.max_bytes),
            email_domain: std::env::var("IMPORT_EMAIL_DOMAIN").unwrap_or(defaults.email_domain),
            password_length: env_or("IMPORT_PASSWORD_LENGTH", defaults.password_length),
        };
        anyhow::ensure!(import.max_rows > 0, "IMPORT_MAX_ROWS must be positive");
        anyhow::ensure!(
            import.password_length >= 8,
            "IMPORT_PASSWORD_LENGTH must be at least 8"
        );

        let admin_emails = parse_admin_emails(&std::env::var("ADMIN_EMAILS").unwrap_or_default());

        Ok(Self {
            database_url,
            jwt,
            import,
            admin_emails,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e == email)
    }
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
