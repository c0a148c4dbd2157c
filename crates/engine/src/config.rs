//! Engine configuration.

use std::time::Duration;

use crate::EngineError;

/// Shortest webhook secret accepted, in random bytes.
pub const MIN_WEBHOOK_SECRET_LEN: usize = 16;

/// Tuning knobs for the scheduler, coordinator and webhook registrar.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on any single connector call.
    pub call_timeout: Duration,
    /// Pause between scheduler cycles. Zero repeats immediately.
    pub cycle_delay: Duration,
    /// Callback URLs handed to connectors are `{webhook_base_url}/{step_id}`.
    pub webhook_base_url: String,
    /// Random bytes in a webhook secret (hex encoded, so twice as many chars).
    pub webhook_secret_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            cycle_delay: Duration::ZERO,
            webhook_base_url: "http://localhost:8080/webhooks".to_string(),
            webhook_secret_len: 32,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ZAPFLOW_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let defaults = Self::default();

        let call_timeout = parse(&lookup, "ZAPFLOW_CALL_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.call_timeout);

        let cycle_delay = parse(&lookup, "ZAPFLOW_CYCLE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.cycle_delay);

        let webhook_secret_len = parse(&lookup, "ZAPFLOW_WEBHOOK_SECRET_LEN")?
            .map(|n| n as usize)
            .unwrap_or(defaults.webhook_secret_len);

        if call_timeout.is_zero() {
            return Err(EngineError::InvalidConfig {
                key: "ZAPFLOW_CALL_TIMEOUT_SECS",
                value: "0".into(),
            });
        }

        if webhook_secret_len < MIN_WEBHOOK_SECRET_LEN {
            return Err(EngineError::InvalidConfig {
                key: "ZAPFLOW_WEBHOOK_SECRET_LEN",
                value: webhook_secret_len.to_string(),
            });
        }

        let webhook_base_url = lookup("ZAPFLOW_WEBHOOK_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.webhook_base_url);

        Ok(Self {
            call_timeout,
            cycle_delay,
            webhook_base_url,
            webhook_secret_len,
        })
    }
}

fn parse(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<u64>, EngineError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EngineError::InvalidConfig { key, value: raw }),
    }
}
