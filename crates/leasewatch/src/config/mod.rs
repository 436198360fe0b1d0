use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub alerts: AlertConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let from_address =
            env::var("APP_ALERT_FROM").unwrap_or_else(|_| "alerts@leasewatch.example".to_string());
        let fallback_address = env::var("APP_ALERT_FALLBACK")
            .unwrap_or_else(|_| "leasing@leasewatch.example".to_string());
        let agents = parse_agent_directory(
            &env::var("APP_AGENT_DIRECTORY").unwrap_or_default(),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            alerts: AlertConfig {
                from_address,
                fallback_address,
                agents,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Alert routing: sender identity, shared leasing inbox, and the static
/// agent-name to address pairs used to deliver sweep alerts.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub from_address: String,
    pub fallback_address: String,
    pub agents: Vec<(String, String)>,
}

/// `APP_AGENT_DIRECTORY` carries `Name=email` pairs separated by `,` or
/// `;`, e.g. `Alice Johnson=alice@example.com;Bob Ortiz=bob@example.com`.
fn parse_agent_directory(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    for item in raw.split([',', ';']) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('=') {
            Some((name, email)) if !name.trim().is_empty() && !email.trim().is_empty() => {
                pairs.push((name.trim().to_string(), email.trim().to_string()));
            }
            _ => {
                return Err(ConfigError::InvalidAgentDirectory {
                    entry: item.to_string(),
                })
            }
        }
    }
    Ok(pairs)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAgentDirectory { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAgentDirectory { entry } => {
                write!(
                    f,
                    "APP_AGENT_DIRECTORY entry '{entry}' must look like Name=email"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidAgentDirectory { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_ALERT_FROM");
        env::remove_var("APP_ALERT_FALLBACK");
        env::remove_var("APP_AGENT_DIRECTORY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.alerts.from_address, "alerts@leasewatch.example");
        assert!(config.alerts.agents.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn agent_directory_parses_name_email_pairs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "APP_AGENT_DIRECTORY",
            "Alice Johnson=alice@example.com; Bob Ortiz=bob@example.com",
        );
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.alerts.agents,
            vec![
                ("Alice Johnson".to_string(), "alice@example.com".to_string()),
                ("Bob Ortiz".to_string(), "bob@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_agent_directory_entry_is_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_AGENT_DIRECTORY", "Alice Johnson");
        let err = AppConfig::load().expect_err("entry without an address");
        assert!(err.to_string().contains("Alice Johnson"));
        reset_env();
    }
}
