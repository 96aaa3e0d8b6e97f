use std::net::SocketAddr;

use anyhow::{Context, Result, bail};

pub const DEFAULT_DATABASE_PATH: &str = "budgetbook.db";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Runtime settings, read from the environment (and an optional `.env` file).
///
/// | Variable | Default |
/// |---|---|
/// | `BUDGETBOOK_DB` | `budgetbook.db` |
/// | `BUDGETBOOK_LISTEN` | `0.0.0.0:$PORT` |
/// | `PORT` | `5000` |
/// | `BUDGETBOOK_LOG_FORMAT` | `text` (or `json`) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    pub listen_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = lookup("BUDGETBOOK_DB")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let listen_addr = match lookup("BUDGETBOOK_LISTEN") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("Invalid BUDGETBOOK_LISTEN address '{}'", addr))?,
            None => {
                let port = match lookup("PORT") {
                    Some(port) => port
                        .parse::<u16>()
                        .with_context(|| format!("Invalid PORT '{}'", port))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let log_format = match lookup("BUDGETBOOK_LOG_FORMAT").as_deref() {
            None | Some("") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(other) => bail!("Invalid BUDGETBOOK_LOG_FORMAT '{}': use text or json", other),
        };

        Ok(Self {
            database_path,
            listen_addr,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_path, "budgetbook.db");
        assert_eq!(config.listen_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_port_and_listen_override() {
        let config = config_from(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);

        let config = config_from(&[("PORT", "8080"), ("BUDGETBOOK_LISTEN", "127.0.0.1:9000")])
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_log_format_and_database() {
        let config = config_from(&[
            ("BUDGETBOOK_LOG_FORMAT", "JSON"),
            ("BUDGETBOOK_DB", "/tmp/ledger.db"),
        ])
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_path, "/tmp/ledger.db");
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("BUDGETBOOK_LISTEN", "localhost")]).is_err());
        assert!(config_from(&[("BUDGETBOOK_LOG_FORMAT", "xml")]).is_err());
    }
}
