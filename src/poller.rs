use crate::metrics::Metrics;
use ch7465lg_client::{
    Client,
    Downstream,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Periodically logs into the modem, records its downstream channels and logs
/// out again. A failed poll is retried on the next tick.
pub struct Poller {
    client: Client,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl Poller {
    pub fn new(client: Client, metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self {
            client,
            metrics,
            interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.interval, modem = %self.client.base_url(), "polling modem");
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            self.tick().await;
        }
        info!("poller stopped");
    }

    /// One poll, with its outcome recorded in the metrics. Channel values are
    /// only published when the whole login, fetch and logout cycle succeeded,
    /// so `ch7465lg_up` always describes the values being served.
    pub async fn tick(&self) {
        match self.poll().await {
            Ok(downstreams) => {
                self.metrics.record_downstreams(&downstreams);
                debug!(
                    channels = downstreams.len(),
                    "fetched and recorded metrics for downstream channels"
                );
            }
            Err(err) => {
                self.metrics.record_failure();
                error!(%err, "could not record metrics");
            }
        }
    }

    async fn poll(&self) -> ch7465lg_client::Result<Vec<Downstream>> {
        self.client.login().await?;

        // The modem allows a single session, log out even if fetching failed.
        let downstreams = self.client.downstreams().await;
        let logout = self.client.logout().await;

        let downstreams = downstreams?;
        logout?;
        Ok(downstreams)
    }
}
