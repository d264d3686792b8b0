use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use serde_json::Value;

use super::types::AttemptTiming;
use crate::database::MetricStore;
use crate::database::models::MetricSample;

/// Assembles probe output into persistable records and writes them through
/// the persistence port.
pub struct MetricRecorder {
    store: Arc<dyn MetricStore>,
}

impl MetricRecorder {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Build a record from the attempt's fields plus the probe's jitter and
    /// persist it. The capture timestamp is taken here, at assembly time.
    pub async fn record(
        &self,
        url: &str,
        timing: &AttemptTiming,
        jitter: f64,
    ) -> Result<MetricSample> {
        let raw = serde_json::to_value(timing).unwrap_or(Value::Null);
        let sample = sample_from_fields(url, &raw, jitter.max(0.0), SystemTime::now());

        self.store.save_sample(&sample).await?;
        Ok(sample)
    }
}

/// A field that is absent or not numeric in the serialized attempt becomes
/// 0.0 instead of blocking persistence of the rest of the record.
fn sample_from_fields(url: &str, raw: &Value, jitter: f64, timestamp: SystemTime) -> MetricSample {
    let field = |name: &str| raw.get(name).and_then(Value::as_f64).unwrap_or(0.0);

    MetricSample {
        id: None,
        url: url.to_string(),
        time_namelookup: field("time_namelookup"),
        time_connect: field("time_connect"),
        time_appconnect: field("time_appconnect"),
        time_pretransfer: field("time_pretransfer"),
        time_redirect: field("time_redirect"),
        time_starttransfer: field("time_starttransfer"),
        time_total: field("time_total"),
        speed_download: field("speed_download"),
        speed_upload: field("speed_upload"),
        size_download: field("size_download"),
        jitter,
        timestamp,
    }
}
