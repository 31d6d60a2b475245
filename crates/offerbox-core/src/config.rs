use std::time::Duration;

use crate::error::CoreError;

/// Runtime configuration, read once at startup from `OFFERBOX_*` variables.
///
/// Storage and mail are optional: when their variables are missing the
/// server still starts and the routes that need them answer with a fixed
/// "configuration missing" error.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// DuckDB file path. `None` leaves the persistence gateway unconfigured.
    pub database_path: Option<String>,
    pub duckdb_memory_limit: String,
    pub mail: Option<MailConfig>,
    /// Log notifications instead of sending them (`OFFERBOX_SMTP_NOOP`).
    pub smtp_noop: bool,
    pub rate_limit_window_ms: u64,
    /// Offer submissions allowed per client IP per window. `0` disables the limiter.
    pub rate_limit_max: u32,
    /// Dashboard secret. `None` rejects every reports request.
    pub reports_password: Option<String>,
    /// Base URL of an ip-api.com compatible lookup service; the IP is appended as a path segment.
    pub geoip_url: String,
    pub outbound_timeout_ms: u64,
    /// Peers (IPs or CIDRs) whose `X-Forwarded-For` is believed when keying
    /// the rate limiter. Empty means loopback and private peers.
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Site owner address that receives offer notifications.
    pub notify_to: String,
}

pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 5;
pub const DEFAULT_GEOIP_URL: &str = "http://ip-api.com/json";

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("OFFERBOX_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| CoreError::InvalidConfig(format!("invalid port: {e}")))?,
            None => 3000,
        };

        let mail = match (var("OFFERBOX_EMAIL_USER"), var("OFFERBOX_EMAIL_PASS")) {
            (Some(username), Some(password)) => Some(MailConfig {
                smtp_host: var("OFFERBOX_SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: var("OFFERBOX_SMTP_PORT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(587),
                notify_to: var("OFFERBOX_NOTIFY_TO").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            database_path: var("OFFERBOX_DATABASE_PATH"),
            duckdb_memory_limit: var("OFFERBOX_DUCKDB_MEMORY").unwrap_or_else(|| "1GB".to_string()),
            mail,
            smtp_noop: var("OFFERBOX_SMTP_NOOP")
                .map(|v| {
                    let v = v.trim();
                    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
                })
                .unwrap_or(false),
            // Unparsable numbers fall back to the defaults rather than failing startup.
            rate_limit_window_ms: var("OFFERBOX_RATE_LIMIT_WINDOW_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_MS),
            rate_limit_max: var("OFFERBOX_RATE_LIMIT_MAX")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX),
            // Taken verbatim: the password is compared as an exact string.
            reports_password: lookup("OFFERBOX_REPORTS_PASSWORD").filter(|v| !v.is_empty()),
            geoip_url: var("OFFERBOX_GEOIP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEOIP_URL.to_string()),
            outbound_timeout_ms: var("OFFERBOX_OUTBOUND_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(5_000),
            trusted_proxies: var("OFFERBOX_TRUSTED_PROXIES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_millis(self.outbound_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, CoreError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config_from(&[]).expect("config");
        assert_eq!(cfg.port, 3000);
        assert!(cfg.database_path.is_none());
        assert!(cfg.mail.is_none());
        assert!(cfg.reports_password.is_none());
        assert!(!cfg.smtp_noop);
        assert_eq!(cfg.rate_limit_window(), Duration::from_secs(900));
        assert_eq!(cfg.rate_limit_max, 5);
        assert_eq!(cfg.geoip_url, "http://ip-api.com/json");
        assert!(cfg.trusted_proxies.is_empty());
    }

    #[test]
    fn trusted_proxies_are_split_on_commas() {
        let cfg = config_from(&[("OFFERBOX_TRUSTED_PROXIES", " 10.0.0.0/8, ,203.0.113.9 ")])
            .expect("config");
        assert_eq!(cfg.trusted_proxies, vec!["10.0.0.0/8", "203.0.113.9"]);
    }

    #[test]
    fn mail_requires_both_user_and_password() {
        let cfg = config_from(&[("OFFERBOX_EMAIL_USER", "owner@example.com")]).expect("config");
        assert!(cfg.mail.is_none());

        let cfg = config_from(&[
            ("OFFERBOX_EMAIL_USER", "owner@example.com"),
            ("OFFERBOX_EMAIL_PASS", "secret"),
        ])
        .expect("config");
        let mail = cfg.mail.expect("mail configured");
        assert_eq!(mail.smtp_host, "smtp.gmail.com");
        assert_eq!(mail.smtp_port, 587);
        assert_eq!(mail.notify_to, "owner@example.com");
    }

    #[test]
    fn rate_limit_overrides_are_applied() {
        let cfg = config_from(&[
            ("OFFERBOX_RATE_LIMIT_WINDOW_MS", "60000"),
            ("OFFERBOX_RATE_LIMIT_MAX", "2"),
        ])
        .expect("config");
        assert_eq!(cfg.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(cfg.rate_limit_max, 2);
    }

    #[test]
    fn unparsable_rate_limit_falls_back_to_defaults() {
        let cfg = config_from(&[("OFFERBOX_RATE_LIMIT_MAX", "many")]).expect("config");
        assert_eq!(cfg.rate_limit_max, DEFAULT_RATE_LIMIT_MAX);
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(config_from(&[("OFFERBOX_PORT", "http")]).is_err());
    }

    #[test]
    fn geoip_url_trailing_slash_is_trimmed() {
        let cfg = config_from(&[("OFFERBOX_GEOIP_URL", "http://127.0.0.1:9000/json/")])
            .expect("config");
        assert_eq!(cfg.geoip_url, "http://127.0.0.1:9000/json");
    }
}
