use std::time::Duration;

use rand::Rng;

/// Uniformly drawn pause in `[min_ms, max_ms]`; bounds are swapped if inverted.
pub(crate) fn uniform_pause(min_ms: u64, max_ms: u64) -> Duration {
    let (low, high) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    Duration::from_millis(rand::rng().random_range(low..=high))
}

pub(crate) async fn pause_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
