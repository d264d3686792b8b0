/// Two-point jitter over a probe's total-time samples, in seconds.
///
/// The absolute difference between the last two samples in collection
/// order, rounded to 6 decimal places; fewer than two samples yield 0.
/// Not a variance or standard deviation: the persisted history depends on
/// this exact two-point definition.
pub fn jitter(total_times: &[f64]) -> f64 {
    let [.., previous, last] = total_times else {
        return 0.0;
    };

    round6((last - previous).abs())
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
