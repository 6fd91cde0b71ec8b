//! Client for the web management interface of the Compal CH7465LG cable
//! modem (sold as "Connect Box").
//!
//! The modem's interface is a pair of RPC endpoints, `/xml/getter.xml` and
//! `/xml/setter.xml`, that take a form with the current session token and a
//! numeric [`Function`] code. Reading channel statistics requires a login
//! first:
//!
//! ```no_run
//! # async fn run() -> ch7465lg_client::Result<()> {
//! let client = ch7465lg_client::Client::new("192.168.178.1", "password")?;
//! client.login().await?;
//! for downstream in client.downstreams().await? {
//!     println!("channel {}: {} dBmV/10", downstream.channel_id, downstream.power);
//! }
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

mod auth;
mod client;
mod downstream;
mod error;
mod form;
pub mod session;

pub use client::{
    AuthState,
    Client,
    ClientBuilder,
    Function,
};
pub use downstream::{
    decode as decode_downstreams,
    Downstream,
};
pub use error::{
    DecodeError,
    Error,
    Result,
};
pub use form::FormValues;
pub use session::SessionStore;
