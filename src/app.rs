use crate::{
    metrics::Metrics,
    poller::Poller,
    server,
    table::format_downstreams,
};
use ch7465lg_client::Client;
use ch7465lg_config::{
    Args,
    Command,
    Config,
};
use color_eyre::Result;
use eyre::Context as _;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
    command: Command,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let command = args.command.unwrap_or(Command::Serve);
        let config = Config::new(args).wrap_err("Failed to load configuration")?;
        config.validate()?;
        Ok(Self { config, command })
    }

    pub async fn run(self) -> Result<()> {
        let client = Client::builder(&self.config.modem_address, self.config.password.clone())
            .timeout(self.config.request_timeout()?)
            .build()?;

        match self.command {
            Command::Serve => self.serve(client).await,
            Command::Downstreams => print_downstreams(client).await,
        }
    }

    async fn serve(self, client: Client) -> Result<()> {
        let metrics = Arc::new(Metrics::new()?);
        let cancel = CancellationToken::new();

        let poller = Poller::new(client, Arc::clone(&metrics), self.config.poll_interval()?);
        let poller = tokio::spawn(poller.run(cancel.clone()));

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("received Ctrl-C, shutting down"),
                    Err(err) => error!(%err, "failed to listen for Ctrl-C, shutting down"),
                }
                cancel.cancel();
            }
        });

        let served = server::serve(self.config.listen_address()?, metrics, cancel.clone()).await;
        cancel.cancel();
        poller.await?;
        served
    }
}

async fn print_downstreams(client: Client) -> Result<()> {
    client.login().await.wrap_err("Failed to log into the modem")?;
    let downstreams = client.downstreams().await;
    client.logout().await.wrap_err("Failed to log out of the modem")?;

    let downstreams = downstreams.wrap_err("Failed to fetch the downstream channels")?;
    println!("{}", format_downstreams(&downstreams));
    Ok(())
}
