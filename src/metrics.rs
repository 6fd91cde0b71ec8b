use ch7465lg_client::Downstream;
use prometheus::{
    GaugeVec,
    IntCounter,
    IntGauge,
    Opts,
    Registry,
    TextEncoder,
};

const NAMESPACE: &str = "ch7465lg";
const DOWNSTREAM_SUBSYSTEM: &str = "ds";
const CHANNEL_LABEL: &str = "channel_id";

/// The exporter's metrics and the registry they are served from.
///
/// Created once at startup and shared between the poller and the scrape
/// handler.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    ds_power: GaugeVec,
    ds_snr: GaugeVec,
    ds_rxmer: GaugeVec,
    up: IntGauge,
    poll_errors: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let ds_power = downstream_gauge("power_dbmv", "Power (dBmV) of downstream channel.")?;
        let ds_snr = downstream_gauge("snr", "Signal-to-noise ratio (SNR) of a downstream channel.")?;
        let ds_rxmer = downstream_gauge(
            "rxmer",
            "Receive modulation error ratio (RxMER) of a downstream channel.",
        )?;
        let up = IntGauge::with_opts(Opts::new("up", "Whether the last poll of the modem succeeded.").namespace(NAMESPACE))?;
        let poll_errors = IntCounter::with_opts(
            Opts::new("poll_errors_total", "Number of failed polls of the modem.").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(ds_power.clone()))?;
        registry.register(Box::new(ds_snr.clone()))?;
        registry.register(Box::new(ds_rxmer.clone()))?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(poll_errors.clone()))?;

        Ok(Self {
            registry,
            ds_power,
            ds_snr,
            ds_rxmer,
            up,
            poll_errors,
        })
    }

    /// Replaces the per-channel gauges with `downstreams`. Channels the modem
    /// no longer reports disappear.
    pub fn record_downstreams(&self, downstreams: &[Downstream]) {
        self.ds_power.reset();
        self.ds_snr.reset();
        self.ds_rxmer.reset();

        for downstream in downstreams {
            let channel_id = downstream.channel_id.to_string();
            let labels = [channel_id.as_str()];
            self.ds_power
                .with_label_values(&labels)
                .set(f64::from(downstream.power));
            self.ds_snr.with_label_values(&labels).set(f64::from(downstream.snr));
            self.ds_rxmer.with_label_values(&labels).set(downstream.rx_mer);
        }
        self.up.set(1);
    }

    pub fn record_failure(&self) {
        self.up.set(0);
        self.poll_errors.inc();
    }

    /// All metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

fn downstream_gauge(name: &str, help: &str) -> prometheus::Result<GaugeVec> {
    GaugeVec::new(
        Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(DOWNSTREAM_SUBSYSTEM),
        &[CHANNEL_LABEL],
    )
}
