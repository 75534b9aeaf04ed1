//! Progress throttling.
//!
//! Downloaders can emit a progress token for every output line; forwarding
//! each one would wake the watch channel (and downstream registry/event
//! consumers) far more often than anyone can observe. The throttle passes a
//! sample through when enough time has elapsed or the value moved enough,
//! and always passes the terminal 100% token.

use std::time::{Duration, Instant};

/// Rate-limiter for percentage progress samples.
pub(crate) struct ProgressThrottle {
    last_emit: Option<Instant>,
    last_percent: f64,
    min_interval: Duration,
    min_delta: f64,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum interval and percent delta.
    pub(crate) const fn new(min_interval: Duration, min_delta: f64) -> Self {
        Self {
            last_emit: None,
            last_percent: 0.0,
            min_interval,
            min_delta,
        }
    }

    /// Create a throttle with defaults (100ms, 1 percentage point).
    pub(crate) const fn default_interval() -> Self {
        Self::new(Duration::from_millis(100), 1.0)
    }

    /// Decide whether this sample should be forwarded.
    pub(crate) fn should_emit(&mut self, percent: f64) -> bool {
        let now = Instant::now();
        let pass = match self.last_emit {
            None => true,
            Some(last) => {
                percent >= 100.0
                    || now.duration_since(last) >= self.min_interval
                    || percent - self.last_percent >= self.min_delta
            }
        };

        if pass {
            self.last_emit = Some(now);
            self.last_percent = percent;
        }
        pass
    }
}
