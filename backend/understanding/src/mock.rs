//! Placeholder recognizer used until a real OCR backend is wired in.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parcelscan_core::{RecognitionError, RecognitionResult, RecognitionService};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Addresses the mock picks from.
pub const MOCK_ADDRESSES: [&str; 5] = [
    "filled.count.soap",
    "index.home.raft",
    "daring.lion.race",
    "family.open.today",
    "laptop.green.view",
];

/// Inclusive confidence range of mock results.
pub const MOCK_CONFIDENCE: std::ops::RangeInclusive<u32> = 70..=99;

/// Simulated processing time of the mock.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(2000);

pub struct MockRecognizer {
    delay: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_MOCK_DELAY,
            failure_rate: 0.0,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic picks, for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fraction of calls (0.0-1.0) that fail with a service error.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn pick(&self) -> Option<RecognitionResult> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            return None;
        }
        let address = MOCK_ADDRESSES[rng.gen_range(0..MOCK_ADDRESSES.len())];
        let confidence = rng.gen_range(MOCK_CONFIDENCE);
        Some(RecognitionResult::new(address, confidence))
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionService for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognitionError> {
        info!(bytes = image.len(), delay_ms = self.delay.as_millis() as u64, "Mock recognition");
        tokio::time::sleep(self.delay).await;

        self.pick().ok_or_else(|| RecognitionError::Service {
            service: "mock".to_string(),
            message: "simulated recognition failure".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn results_stay_in_placeholder_range() {
        let mock = MockRecognizer::seeded(7).with_delay(Duration::ZERO);
        for _ in 0..50 {
            let result = mock.recognize(b"img").await.unwrap();
            assert!(MOCK_ADDRESSES.contains(&result.address.as_str()));
            assert!(MOCK_CONFIDENCE.contains(&(result.confidence as u32)));
        }
    }

    #[tokio::test]
    async fn seeded_mocks_agree() {
        let a = MockRecognizer::seeded(42).with_delay(Duration::ZERO);
        let b = MockRecognizer::seeded(42).with_delay(Duration::ZERO);
        assert_eq!(a.recognize(b"x").await.unwrap(), b.recognize(b"x").await.unwrap());
    }

    #[tokio::test]
    async fn full_failure_rate_always_fails() {
        let mock = MockRecognizer::seeded(1)
            .with_delay(Duration::ZERO)
            .with_failure_rate(1.0);
        assert!(matches!(
            mock.recognize(b"x").await,
            Err(RecognitionError::Service { .. })
        ));
    }
}
