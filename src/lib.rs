//! # CH7465LG Exporter
//!
//! Polls a Compal CH7465LG cable modem for the statistics of its bonded
//! downstream channels and serves them as Prometheus metrics.
//!
//! - **`metrics`**: the metric registry and gauges, keyed by channel id
//! - **`poller`**: login, fetch and logout once per interval
//! - **`server`**: the `/metrics` and `/healthz` endpoints
//!
//! ```bash
//! MODEM_PASSWORD=... ch7465lg-exporter --modem-address 192.168.178.1 --listen-address 0.0.0.0:9810
//! ```

#[macro_use]
extern crate tracing;

mod app;
mod error;
mod logging;
pub mod metrics;
pub mod poller;
pub mod server;
mod table;

pub use app::App;
pub use ch7465lg_config::Args;
pub use error::AppError;
pub use logging::{
    init_errors,
    init_logging,
};
pub use metrics::Metrics;
pub use table::format_downstreams;
