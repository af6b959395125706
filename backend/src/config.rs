use clap::Parser;
use rand::{distributions::Alphanumeric, Rng};

use crate::routes::DEFAULT_BODY_LIMIT;

/// Personal scheduling backend
#[derive(Parser, Debug, Clone)]
#[command(name = "planbook")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "PLANBOOK_BIND")]
    pub bind: String,

    /// sqlite: or postgres:// connection URL
    #[arg(long, default_value = "sqlite:planbook.db?mode=rwc", env = "DATABASE_URL")]
    pub database_url: String,

    /// Fixed session lifetime, measured from sign-in
    #[arg(long, default_value_t = 5, env = "PLANBOOK_SESSION_TTL_HOURS",
          value_parser = clap::value_parser!(u32).range(1..=720))]
    pub session_ttl_hours: u32,

    /// Shared secret the identity front sends in `x-identity-secret`.
    /// Generated and written to identity_secret.txt when not set.
    #[arg(long, env = "PLANBOOK_IDENTITY_SECRET", hide_env_values = true)]
    pub identity_secret: Option<String>,

    /// Mark session cookies Secure (serve behind TLS)
    #[arg(long, env = "PLANBOOK_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "PLANBOOK_BODY_LIMIT")]
    pub body_limit: usize,
}

impl Config {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_ttl_hours))
    }
}

pub fn generate_identity_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["planbook"]).unwrap();
        assert_eq!(config.session_ttl(), chrono::Duration::hours(5));
        assert_eq!(config.body_limit, 2 * 1024 * 1024);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "planbook",
            "--database-url",
            "postgres://localhost/planbook",
            "--session-ttl-hours",
            "8",
            "--identity-secret",
            "abc",
            "--secure-cookies",
        ])
        .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/planbook");
        assert_eq!(config.session_ttl(), chrono::Duration::hours(8));
        assert_eq!(config.identity_secret.as_deref(), Some("abc"));
        assert!(config.secure_cookies);
    }

    #[test]
    fn generated_secrets_differ() {
        let a = generate_identity_secret();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, generate_identity_secret());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(Config::try_parse_from(["planbook", "--session-ttl-hours", "0"]).is_err());
    }
}
