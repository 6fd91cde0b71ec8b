#[macro_use]
extern crate tracing;

mod app_config;
mod args;

use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::{
    Args,
    Command,
};
use color_eyre::Result;
use eyre::{
    bail,
    Context as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::SocketAddr,
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const ENV_PREFIX: &str = "CH7465LG";

/// Exporter settings, merged from the built-in defaults, `config.yaml` in
/// the config directory, `CH7465LG_*` environment variables and the command
/// line (in increasing precedence).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    pub modem_address: String,
    pub listen_address: String,
    pub poll_interval: String,
    pub request_timeout: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder(config::Config::builder())
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize())
            .expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let config_dir = get_config_dir();
        let mut builder = Self::builder(config::Config::builder())?;

        let config_files = [("config.yaml", config::FileFormat::Yaml)];
        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(modem = %cfg.modem_address, listen = %cfg.listen_address, "loaded configuration");
        Ok(cfg)
    }

    fn builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        Ok(builder
            .set_default("config_dir", get_config_dir().to_string_lossy().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml)))
    }

    /// Checks that every setting can be used, most notably that a password
    /// was provided.
    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() {
            bail!("Environment variable `MODEM_PASSWORD` is required.");
        }
        if self.modem_address.trim().is_empty() {
            bail!("The modem address must not be empty.");
        }
        self.listen_address()?;
        self.poll_interval()?;
        self.request_timeout()?;
        Ok(())
    }

    /// The metrics bind address. A bare `:port` listens on all interfaces.
    pub fn listen_address(&self) -> Result<SocketAddr> {
        let address = self.listen_address.trim();
        let address = match address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => address.to_string(),
        };
        address
            .parse()
            .wrap_err_with(|| format!("Invalid listen address {:?}", self.listen_address))
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        parse_duration("poll interval", &self.poll_interval)
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration("request timeout", &self.request_timeout)
    }
}

fn parse_duration(what: &str, value: &str) -> Result<Duration> {
    let duration =
        humantime::parse_duration(value).wrap_err_with(|| format!("Invalid {what} {value:?}"))?;
    if duration.is_zero() {
        bail!("The {what} must be greater than zero.");
    }
    Ok(duration)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn with_password() -> Config {
        Config {
            password: "secret".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.modem_address, "192.168.178.1");
        assert_eq!(config.listen_address().expect("valid"), "0.0.0.0:9810".parse::<SocketAddr>().expect("valid"));
        assert_eq!(config.poll_interval().expect("valid"), Duration::from_secs(30));
        assert_eq!(config.request_timeout().expect("valid"), Duration::from_secs(10));
        assert!(config.password.is_empty());
    }

    #[test]
    fn password_is_required() {
        let err = Config::default().validate().expect_err("no password");
        assert!(err.to_string().contains("MODEM_PASSWORD"));
        with_password().validate().expect("valid config");
    }

    #[test]
    fn rejects_bad_durations() {
        let config = Config {
            poll_interval: "soon".to_string(),
            ..with_password()
        };
        assert!(config.validate().is_err());

        let config = Config {
            request_timeout: "0s".to_string(),
            ..with_password()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn port_only_listen_address_binds_all_interfaces() {
        let config = Config {
            listen_address: ":9810".to_string(),
            ..with_password()
        };
        config.validate().expect("valid config");
        assert_eq!(
            config.listen_address().expect("valid"),
            "0.0.0.0:9810".parse::<SocketAddr>().expect("valid")
        );
    }

    #[test]
    fn rejects_bad_listen_address() {
        for listen_address in ["9810", ":", ":http", "localhost:9810"] {
            let config = Config {
                listen_address: listen_address.to_string(),
                ..with_password()
            };
            assert!(config.validate().is_err(), "{listen_address:?}");
        }
    }

    #[test]
    fn args_override_defaults() {
        let args = Args {
            modem_address: Some("10.0.0.1".to_string()),
            password: Some("secret".to_string()),
            poll_interval: Some("1m".to_string()),
            ..Args::default()
        };
        let source = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(args)
            .build()
            .expect("valid sources");
        let config: Config = source.try_deserialize().expect("valid config");

        assert_eq!(config.modem_address, "10.0.0.1");
        assert_eq!(config.password, "secret");
        assert_eq!(config.poll_interval().expect("valid"), Duration::from_secs(60));
        assert_eq!(config.listen_address, "0.0.0.0:9810");
        config.validate().expect("valid config");
    }

    #[test]
    fn password_is_never_serialized() {
        let yaml = serde_yml::to_string(&with_password()).expect("serializable");
        assert!(!yaml.contains("secret"));
        assert!(yaml.contains("modem_address"));
    }
}
