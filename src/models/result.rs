//! Typed speedtest result

use serde::{Deserialize, Serialize};

/// One speedtest run as produced by `speedtest --json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestResult {
    /// Server identifier
    pub test_id: String,
    /// Address of the measuring client
    pub client_ip: String,
    pub country: String,
    /// Organization hosting the server
    pub sponsor: String,
    pub download_bytes_per_sec: f64,
    pub upload_bytes_per_sec: f64,
    pub ping_milliseconds: f64,
}

impl SpeedTestResult {
    /// Label values in the order the gauges declare them: id, ip, country, sponsor
    pub fn label_values(&self) -> [&str; 4] {
        [&self.test_id, &self.client_ip, &self.country, &self.sponsor]
    }
}
