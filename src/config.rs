use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "TCM Clinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Batch weight used when a prescription or formula preview does not declare one.
pub const DEFAULT_TOTAL_GRAMS: f64 = 100.0;

const DEFAULT_PORT: u16 = 8420;

/// Get the application data directory
/// ~/TcmClinic/ on all platforms. Falls back to the working directory
/// when no home directory can be determined (containers, CI).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("TcmClinic")
}

/// Default SQLite database location
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,tcm_clinic_lib=debug"
}

/// Listener and storage settings for the HTTP service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            db_path: database_path(),
        }
    }
}

impl ServerConfig {
    /// Read `TCM_CLINIC_HOST`, `TCM_CLINIC_PORT` and `TCM_CLINIC_DB`,
    /// keeping defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let host = lookup("TCM_CLINIC_HOST").and_then(|h| match h.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(host = %h, "Ignoring invalid TCM_CLINIC_HOST");
                None
            }
        });
        if let Some(ip) = host {
            cfg.addr.set_ip(ip);
        }

        if let Some(port) = lookup("TCM_CLINIC_PORT").and_then(|p| p.parse::<u16>().ok()) {
            cfg.addr.set_port(port);
        }

        if let Some(path) = lookup("TCM_CLINIC_DB").filter(|p| !p.trim().is_empty()) {
            cfg.db_path = PathBuf::from(path);
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("clinic.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn env_overrides_applied() {
        let vars: HashMap<&str, &str> = [
            ("TCM_CLINIC_HOST", "0.0.0.0"),
            ("TCM_CLINIC_PORT", "9000"),
            ("TCM_CLINIC_DB", "/tmp/clinic-test.db"),
        ]
        .into_iter()
        .collect();

        let cfg = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.addr.to_string(), "0.0.0.0:9000");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/clinic-test.db"));
    }

    #[test]
    fn invalid_env_keeps_defaults() {
        let cfg = ServerConfig::from_lookup(|k| match k {
            "TCM_CLINIC_HOST" => Some("not-an-ip".into()),
            "TCM_CLINIC_PORT" => Some("99999".into()),
            _ => None,
        });
        assert_eq!(cfg, ServerConfig::default());
    }
}
