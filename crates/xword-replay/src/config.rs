//! Engine configuration.

use std::time::Duration;

use xword_grid::GridBounds;

/// Timing and detection settings shared by the recorder and the replay.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Quiet interval before a burst of change notifications is diffed
    pub debounce: Duration,

    /// Wall-clock quantum of one playback tick
    pub tick_interval: Duration,

    /// How long the completion notice stays up
    pub completion_notice: Duration,

    /// Accepted grid sizes for structure detection
    pub bounds: GridBounds,

    /// Emit `Letter` actions for cells already filled at recording start
    pub bootstrap_letters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            tick_interval: Duration::from_millis(100),
            completion_notice: Duration::from_millis(3000),
            bounds: GridBounds::default(),
            bootstrap_letters: false,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; `from_env` reads the process env.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bounds = GridBounds {
            min_size: setting(&lookup, "XWORD_MIN_SIZE").unwrap_or(defaults.bounds.min_size),
            max_size: setting(&lookup, "XWORD_MAX_SIZE").unwrap_or(defaults.bounds.max_size),
            canonical_sizes: defaults.bounds.canonical_sizes.clone(),
        };

        let tick_ms = setting::<u64>(&lookup, "XWORD_TICK_MS").filter(|&ms| {
            if ms == 0 {
                tracing::warn!("XWORD_TICK_MS must be positive; using default");
            }
            ms > 0
        });

        Self {
            debounce: setting(&lookup, "XWORD_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            tick_interval: tick_ms.map(Duration::from_millis).unwrap_or(defaults.tick_interval),
            completion_notice: setting(&lookup, "XWORD_COMPLETION_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.completion_notice),
            bounds,
            bootstrap_letters: setting(&lookup, "XWORD_BOOTSTRAP_LETTERS")
                .unwrap_or(defaults.bootstrap_letters),
        }
    }

    pub(crate) fn completion_ms(&self) -> u64 {
        self.completion_notice.as_millis() as u64
    }
}

/// Settings for the replay viewer server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: setting(&|key: &str| std::env::var(key).ok(), "XWORD_PORT")
                .unwrap_or(Self::default().port),
        }
    }
}

/// Look up and parse one setting; unparsable values are logged and ignored.
fn setting<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.completion_ms(), 3000);
        assert_eq!(config.bounds.min_size, 3);
        assert_eq!(config.bounds.max_size, 21);
        assert!(!config.bootstrap_letters);
        assert_eq!(ServerConfig::default().port, 3000);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_every_field() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("XWORD_DEBOUNCE_MS", "250"),
            ("XWORD_TICK_MS", "40"),
            ("XWORD_COMPLETION_MS", " 1500 "),
            ("XWORD_MIN_SIZE", "4"),
            ("XWORD_MAX_SIZE", "15"),
            ("XWORD_BOOTSTRAP_LETTERS", "true"),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.tick_interval, Duration::from_millis(40));
        assert_eq!(config.completion_ms(), 1500);
        assert_eq!(config.bounds.min_size, 4);
        assert_eq!(config.bounds.max_size, 15);
        assert_eq!(config.bounds.canonical_sizes, vec![5, 15]);
        assert!(config.bootstrap_letters);
    }

    #[test]
    fn invalid_env_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("XWORD_DEBOUNCE_MS", "soon"),
            ("XWORD_TICK_MS", "0"),
            ("XWORD_MAX_SIZE", "-3"),
            ("XWORD_BOOTSTRAP_LETTERS", "yes"),
        ]));
        assert_eq!(config, EngineConfig::default());

        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
    }
}
