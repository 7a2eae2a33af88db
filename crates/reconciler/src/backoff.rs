use std::time::Duration;

use rand::{thread_rng, Rng};

/// Jittered exponential backoff for retrying failed reconciliation passes.
pub struct RetryBackoff {
    base: Duration,
    current_factor: f32,
    growth: f32,
    max_sleep: Duration,
}

impl RetryBackoff {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            current_factor: 1.0,
            growth: 2.0,
            max_sleep: base * 32,
        }
    }

    pub fn with_max_sleep(self, max_sleep: Duration) -> Self {
        Self { max_sleep, ..self }
    }

    pub fn next_sleep(&mut self) -> Duration {
        let t = self.base.mul_f32(self.current_factor);
        let t = if t >= self.max_sleep {
            self.max_sleep
        } else {
            self.current_factor *= self.growth;
            t
        };
        // https://aws.amazon.com/cn/blogs/architecture/exponential-backoff-and-jitter/
        thread_rng().gen_range(Duration::ZERO..t)
    }

    pub fn reset(&mut self) {
        self.current_factor = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_growth_caps_at_max() {
        let mut b =
            RetryBackoff::new(Duration::from_secs(1)).with_max_sleep(Duration::from_secs(8));
        b.next_sleep();
        assert!(b.current_factor == 2.0);
        b.next_sleep();
        assert!(b.current_factor == 4.0);
        for _ in 0..10 {
            b.next_sleep();
        }
        assert!(b.current_factor == 8.0);
        b.reset();
        assert!(b.current_factor == 1.0);
    }
}
