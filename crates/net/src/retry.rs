//! Retry logic and backoff calculations for transfers

use std::time::Duration;

/// Retry configuration for transfers
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff delay
    pub initial_delay: Duration,
    /// Maximum backoff delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Calculate exponential backoff delay with jitter
///
/// `attempt` is 1 for the first retry.
#[must_use]
pub fn calculate_backoff_delay(retry_config: &RetryConfig, attempt: u32) -> Duration {
    // Precision loss acceptable for backoff calculations
    #[allow(clippy::cast_precision_loss)]
    let base_delay = retry_config
        .initial_delay
        .as_millis()
        .min(u128::from(u64::MAX)) as f64;
    #[allow(clippy::cast_precision_loss)]
    let max_delay = retry_config.max_delay.as_millis().min(u128::from(u64::MAX)) as f64;

    // Retry attempts are small, the clamp keeps the cast lossless
    #[allow(clippy::cast_possible_wrap)]
    let exponent = attempt.saturating_sub(1).min(30) as i32;
    let delay = (base_delay * retry_config.backoff_multiplier.powi(exponent)).min(max_delay);

    let jitter = delay * retry_config.jitter_factor * (rand::random::<f64>() - 0.5);

    // max(0.0) keeps it non-negative
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let final_delay = (delay + jitter).max(0.0).round() as u64;

    Duration::from_millis(final_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        assert_eq!(calculate_backoff_delay(&config, 1), Duration::from_millis(100));
        assert_eq!(calculate_backoff_delay(&config, 2), Duration::from_millis(200));
        assert_eq!(calculate_backoff_delay(&config, 3), Duration::from_millis(350));
        assert_eq!(calculate_backoff_delay(&config, 60), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_in_band() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(1000),
            jitter_factor: 0.2,
            ..RetryConfig::default()
        };
        for _ in 0..50 {
            let d = calculate_backoff_delay(&config, 1).as_millis();
            assert!((900..=1100).contains(&d), "{d}");
        }
    }
}
