use std::time::Instant;

/// Milliseconds since the owning clock was created, with sub-millisecond precision.
pub type Timestamp = f64;

/// Monotonic high-resolution clock anchored at client creation.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Clock { origin: Instant::now() }
    }

    pub fn now(&self) -> Timestamp {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed milliseconds between two timestamps, rounded to two decimals.
pub fn elapsed_ms(start: Timestamp, end: Timestamp) -> f64 {
    ((end - start) * 100.0).round() / 100.0
}
