use clap::{
    Parser,
    Subcommand,
};

/// Prometheus exporter for the downstream channels of a Compal CH7465LG modem.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address of the modem, `host[:port]` or a full URL.
    #[arg(long, visible_alias = "gw", value_name = "HOST", global = true)]
    pub modem_address: Option<String>,

    /// Password of the modem's web interface.
    #[arg(long, env = "MODEM_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Address the metrics endpoint listens on.
    #[arg(long, visible_alias = "prom", value_name = "ADDR", global = true)]
    pub listen_address: Option<String>,

    /// Time between two polls of the modem, e.g. "30s" or "2m".
    #[arg(long, value_name = "DURATION", global = true)]
    pub poll_interval: Option<String>,

    /// Timeout for each request to the modem, e.g. "10s".
    #[arg(long, value_name = "DURATION", global = true)]
    pub request_timeout: Option<String>,

    /// Log debug output.
    #[arg(long, short, action, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll the modem periodically and serve the metrics (default).
    Serve,
    /// Log in once, print the downstream channel table and log out.
    Downstreams,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            let options = [
                ("modem_address", &self.modem_address),
                ("password", &self.password),
                ("listen_address", &self.listen_address),
                ("poll_interval", &self.poll_interval),
                ("request_timeout", &self.request_timeout),
            ];
            for (key, value) in options {
                if let Some(value) = value {
                    cache.insert(key.to_string(), value.clone().into());
                }
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
