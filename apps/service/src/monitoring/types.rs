use serde::{Deserialize, Serialize};

/// Phase timings and throughput of a single fetch attempt.
///
/// All `time_*` fields are cumulative seconds from the start of the attempt,
/// matching the phase boundaries curl reports: name lookup done, TCP
/// established, TLS handshake done, about to send the request, first
/// response byte seen, connection drained. Speeds are bytes/sec, size is
/// bytes. Transient: only the final attempt of a probe reaches storage,
/// earlier ones exist to feed the jitter calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptTiming {
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
}

/// Outcome of one full probe: the last attempt's timings plus the jitter
/// derived from all collected attempts.
#[derive(Debug, Clone)]
pub struct ProbeReading {
    pub last: AttemptTiming,
    pub jitter: f64,
}

impl ProbeReading {
    /// All-zero reading recorded when every attempt failed at the transport
    /// level, so an attempted endpoint always leaves a row behind.
    pub fn unreachable() -> Self {
        Self { last: AttemptTiming::default(), jitter: 0.0 }
    }
}
