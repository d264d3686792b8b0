use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A monitored endpoint, identified by its URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Option<i64>,
    pub url: String,
    pub added_on: SystemTime,
}

/// One probe outcome for one endpoint.
///
/// Field names and units (seconds, bytes/sec, bytes) are the storage
/// contract shared with downstream tooling; do not rename.
///
/// `timestamp` is assigned when the record is assembled for storage, not
/// when the underlying fetch ran, so it reflects "when stored" rather than
/// "when measured".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: Option<i64>,
    pub url: String,
    pub time_namelookup: f64,
    pub time_connect: f64,
    pub time_appconnect: f64,
    pub time_pretransfer: f64,
    pub time_redirect: f64,
    pub time_starttransfer: f64,
    pub time_total: f64,
    pub speed_download: f64,
    pub speed_upload: f64,
    pub size_download: f64,
    pub jitter: f64,
    pub timestamp: SystemTime,
}

/// Convert SystemTime to Unix timestamp
pub fn timestamp_to_i64(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Convert Unix timestamp to SystemTime
pub fn i64_to_timestamp(timestamp: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let now = SystemTime::now();
        let secs = timestamp_to_i64(now);
        let back = timestamp_to_i64(i64_to_timestamp(secs));
        assert_eq!(secs, back);
    }
}
