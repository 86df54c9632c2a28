//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, a config file, and `CRM_*` environment
//! variables. Unset optional values fall back to the defaults below.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crm_backend::domain::crm::AlertPolicy;
use crm_backend::inbound::http::session_config::SessionToggles;
use crm_backend::inbound::http::state::DEFAULT_METRICS_WINDOW_DAYS;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_CHECKOUT_TIMEOUT_SECS: u64 = 5;

/// Every knob the server reads at startup.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CRM")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Deals are kept in memory when unset.
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub db_checkout_timeout_secs: Option<u64>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
    pub session_key_file: Option<PathBuf>,
    pub session_cookie_secure: Option<bool>,
    /// `Strict`, `Lax` or `None`.
    pub session_same_site: Option<String>,
    pub session_allow_ephemeral: Option<bool>,
    /// Days without interaction before a deal needs follow-up.
    pub follow_up_after_days: Option<i64>,
    /// Minor-unit value at which dormant deals raise a high-value alert.
    pub high_value_threshold: Option<i64>,
    /// Trailing window for metric requests that name no range.
    pub metrics_window_days: Option<i64>,
}

impl AppSettings {
    /// Parse the bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind_addr '{raw}': {err}"),
            )
        })
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    pub fn db_checkout_timeout(&self) -> Duration {
        Duration::from_secs(
            self.db_checkout_timeout_secs
                .unwrap_or(DEFAULT_DB_CHECKOUT_TIMEOUT_SECS),
        )
    }

    pub fn metrics_window_days(&self) -> i64 {
        self.metrics_window_days
            .unwrap_or(DEFAULT_METRICS_WINDOW_DAYS)
    }

    /// Alert thresholds with unset values taken from the default policy.
    pub fn alert_policy(&self) -> AlertPolicy {
        let defaults = AlertPolicy::default();
        AlertPolicy {
            follow_up_after_days: self
                .follow_up_after_days
                .unwrap_or(defaults.follow_up_after_days),
            high_value_threshold: self
                .high_value_threshold
                .unwrap_or(defaults.high_value_threshold),
        }
    }

    /// Raw session toggles for validation by `session_settings`.
    pub fn session_toggles(&self) -> SessionToggles {
        SessionToggles {
            key_file: self.session_key_file.clone(),
            cookie_secure: self.session_cookie_secure,
            same_site: self.session_same_site.clone(),
            allow_ephemeral: self.session_allow_ephemeral,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 12] = [
        "CRM_BIND_ADDR",
        "CRM_DATABASE_URL",
        "CRM_DB_MAX_CONNECTIONS",
        "CRM_DB_CHECKOUT_TIMEOUT_SECS",
        "CRM_RUN_MIGRATIONS",
        "CRM_SESSION_KEY_FILE",
        "CRM_SESSION_COOKIE_SECURE",
        "CRM_SESSION_SAME_SITE",
        "CRM_SESSION_ALLOW_EPHEMERAL",
        "CRM_FOLLOW_UP_AFTER_DAYS",
        "CRM_HIGH_VALUE_THRESHOLD",
        "CRM_METRICS_WINDOW_DAYS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("crm-backend")]).expect("config should load")
    }

    fn cleared_except(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared_except(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("literal")
        );
        assert!(settings.database_url.is_none());
        assert!(!settings.run_migrations);
        assert_eq!(settings.db_max_connections(), 10);
        assert_eq!(settings.db_checkout_timeout(), Duration::from_secs(5));
        assert_eq!(settings.metrics_window_days(), 90);
        assert_eq!(settings.alert_policy(), AlertPolicy::default());
        assert_eq!(settings.session_toggles(), SessionToggles::default());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_except(&[
            ("CRM_BIND_ADDR", "127.0.0.1:9090"),
            ("CRM_DATABASE_URL", "postgres://crm@localhost/crm"),
            ("CRM_RUN_MIGRATIONS", "true"),
            ("CRM_SESSION_COOKIE_SECURE", "false"),
            ("CRM_SESSION_SAME_SITE", "Lax"),
            ("CRM_FOLLOW_UP_AFTER_DAYS", "5"),
            ("CRM_HIGH_VALUE_THRESHOLD", "2500000"),
            ("CRM_METRICS_WINDOW_DAYS", "30"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind addr"),
            "127.0.0.1:9090".parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://crm@localhost/crm")
        );
        assert!(settings.run_migrations);
        assert_eq!(settings.metrics_window_days(), 30);
        assert_eq!(
            settings.alert_policy(),
            AlertPolicy {
                follow_up_after_days: 5,
                high_value_threshold: 2_500_000,
            }
        );
        let toggles = settings.session_toggles();
        assert_eq!(toggles.cookie_secure, Some(false));
        assert_eq!(toggles.same_site.as_deref(), Some("Lax"));
    }

    #[rstest]
    fn malformed_bind_addr_is_reported() {
        let _guard = lock_env(cleared_except(&[("CRM_BIND_ADDR", "not-an-address")]));

        let err = load_from_empty_args()
            .bind_addr()
            .expect_err("invalid address");
        assert!(err.to_string().contains("not-an-address"));
    }
}
