//! Gauge instruments for a speedtest result

use crate::error::Result;
use crate::models::SpeedTestResult;
use prometheus::{GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Download rate gauge name
pub const DOWNLOAD: &str = "speedtest_download_bytes_per_sec";
/// Upload rate gauge name
pub const UPLOAD: &str = "speedtest_upload_bytes_per_sec";
/// Ping latency gauge name
pub const PING: &str = "speedtest_ping_msec";

/// Label names shared by every gauge, in declaration order
pub const LABELS: [&str; 4] = ["id", "ip", "country", "sponsor"];

/// The three speedtest gauges and the registry they are registered in
#[derive(Clone)]
pub struct MetricSet {
    registry: Registry,
    download: GaugeVec,
    upload: GaugeVec,
    ping: GaugeVec,
    /// Label tuples written by `record`; reads never create series
    recorded: Arc<Mutex<HashSet<[String; 4]>>>,
}

impl MetricSet {
    /// Register the download, upload and ping gauges against `registry`.
    ///
    /// A registry that already holds one of these names is rejected with
    /// [`AppError::Registration`](crate::error::AppError::Registration).
    pub fn new(registry: Registry) -> Result<Self> {
        let download = register(&registry, DOWNLOAD, "download")?;
        let upload = register(&registry, UPLOAD, "upload")?;
        let ping = register(&registry, PING, "ping")?;

        Ok(Self {
            registry,
            download,
            upload,
            ping,
            recorded: Arc::default(),
        })
    }

    /// Set all three gauges for the result's label tuple
    pub fn record(&self, result: &SpeedTestResult) {
        let labels = result.label_values();

        self.download
            .with_label_values(&labels)
            .set(result.download_bytes_per_sec);
        self.upload
            .with_label_values(&labels)
            .set(result.upload_bytes_per_sec);
        self.ping
            .with_label_values(&labels)
            .set(result.ping_milliseconds);

        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.insert(labels.map(String::from));
        }
    }

    /// Registry holding the gauges, as handed to the pusher
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Look up a gauge family by metric name
    pub fn gauge(&self, name: &str) -> Option<&GaugeVec> {
        match name {
            DOWNLOAD => Some(&self.download),
            UPLOAD => Some(&self.upload),
            PING => Some(&self.ping),
            _ => None,
        }
    }

    /// Current value of `name` for a label tuple.
    ///
    /// `None` for an unknown metric or a tuple that was never recorded.
    /// Looking up never adds a series to the registry.
    pub fn value(&self, name: &str, labels: &[&str]) -> Option<f64> {
        let gauge = self.gauge(name)?;
        let key: [String; 4] = <[&str; 4]>::try_from(labels).ok()?.map(String::from);

        let recorded = self.recorded.lock().ok()?.contains(&key);
        if !recorded {
            return None;
        }
        gauge.get_metric_with_label_values(labels).ok().map(|g| g.get())
    }

    /// Render the registry in Prometheus text format
    pub fn render(&self) -> Result<String> {
        encode(&self.registry)
    }
}

fn register(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), &LABELS)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Encode every family in `registry` using the text exposition format
pub fn encode(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    Ok(encoder.encode_to_string(&registry.gather())?)
}
