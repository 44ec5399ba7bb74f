use lazy_static::lazy_static;

lazy_static! {
    /// Logging configuration.
    pub static ref RUST_LOG: String =
        dotenvy::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    /// Domain name, with no trailing slash. Example: `https://photos.example.org`
    pub static ref DOMAIN_NAME: String = dotenvy::var("DOMAIN_NAME")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string();

    /// Socket address to listen on.
    pub static ref BIND_ADDRESS: String =
        dotenvy::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    /// SQLite database location.
    pub static ref DATABASE_URL: String =
        dotenvy::var("DATABASE_URL").expect("missing DATABASE_URL environment variable");

    /// Directory where uploaded photo blobs are kept.
    pub static ref MEDIA_DIR: String =
        dotenvy::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string());

    /// SMTP configuration, absent when email notifications are disabled.
    pub static ref SMTP: Option<SmtpConfig> = SmtpConfig::from_env();
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

impl SmtpConfig {
    fn from_env() -> Option<SmtpConfig> {
        Some(SmtpConfig {
            host: dotenvy::var("SMTP_HOST").ok()?,
            port: dotenvy::var("SMTP_HOST_PORT").ok()?.parse().ok()?,
            username: dotenvy::var("SMTP_USERNAME").ok()?,
            password: dotenvy::var("SMTP_PASSWORD").ok()?,
            from_name: dotenvy::var("SMTP_FROM_NAME").ok()?,
            from_address: dotenvy::var("SMTP_FROM_ADDRESS").ok()?,
        })
    }
}
