//! Engine configuration

use crate::state_machine::format::DEFAULT_LOCALE;
use std::time::Duration;

/// Timer and locale settings for a chat runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Listening is stopped after this long without input
    pub silence_timeout: Duration,
    /// How long a peer typing indicator stays visible
    pub typing_ttl: Duration,
    /// Minimum spacing between outbound typing posts
    pub typing_throttle: Duration,
    /// Repeat period of a held interval adjustment control
    pub hold_repeat: Duration,
    /// Offline alert countdown; disabled when `None`
    pub response_timeout: Option<Duration>,
    pub fallback_locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_millis(5000),
            typing_ttl: Duration::from_millis(3000),
            typing_throttle: Duration::from_millis(3000),
            hold_repeat: Duration::from_millis(150),
            response_timeout: None,
            fallback_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            silence_timeout: env_millis("WEBCHAT_SILENCE_TIMEOUT_MS")
                .unwrap_or(defaults.silence_timeout),
            typing_ttl: env_millis("WEBCHAT_TYPING_TTL_MS").unwrap_or(defaults.typing_ttl),
            typing_throttle: env_millis("WEBCHAT_TYPING_THROTTLE_MS")
                .unwrap_or(defaults.typing_throttle),
            hold_repeat: env_millis("WEBCHAT_HOLD_REPEAT_MS").unwrap_or(defaults.hold_repeat),
            response_timeout: env_millis("WEBCHAT_RESPONSE_TIMEOUT_MS"),
            fallback_locale: std::env::var("WEBCHAT_FALLBACK_LOCALE")
                .ok()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or(defaults.fallback_locale),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    parse_millis(&std::env::var(key).ok()?)
}

fn parse_millis(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
