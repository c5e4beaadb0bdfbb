//! Server configuration, read from `OMOK_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use omok_protocol::UserId;
use omok_room::RoomConfig;
use omok_session::SessionConfig;

use crate::ConfigError;

const BIND: &str = "OMOK_BIND";
const TURN_TIMEOUT: &str = "OMOK_TURN_TIMEOUT_SECS";
const REMATCH_WINDOW: &str = "OMOK_REMATCH_WINDOW_SECS";
const IDLE_TIMEOUT: &str = "OMOK_IDLE_TIMEOUT_SECS";
const STORE_PATH: &str = "OMOK_STORE_PATH";
const TOKENS: &str = "OMOK_TOKENS";

/// Everything needed to run a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    pub room: RoomConfig,
    pub session: SessionConfig,
    /// JSON-lines file that finished matches are appended to.
    pub store_path: PathBuf,
    /// Pre-provisioned `(token, user)` pairs for the token table.
    pub tokens: Vec<(String, UserId)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            room: RoomConfig::default(),
            session: SessionConfig::default(),
            store_path: PathBuf::from("matches.jsonl"),
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `OMOK_BIND` | `0.0.0.0:8080` |
    /// | `OMOK_TURN_TIMEOUT_SECS` | `30` |
    /// | `OMOK_REMATCH_WINDOW_SECS` | `120` |
    /// | `OMOK_IDLE_TIMEOUT_SECS` | `60` |
    /// | `OMOK_STORE_PATH` | `matches.jsonl` |
    /// | `OMOK_TOKENS` | none (`alice=1,bob=2`) |
    ///
    /// # Errors
    /// [`ConfigError`] naming the first variable with an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(BIND) {
            if addr.trim().is_empty() {
                return Err(ConfigError::Empty { var: BIND });
            }
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(value) = lookup(TURN_TIMEOUT) {
            config.room.turn_timeout = parse_secs(TURN_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(REMATCH_WINDOW) {
            config.room.rematch_window = parse_secs(REMATCH_WINDOW, &value)?;
        }
        if let Some(value) = lookup(IDLE_TIMEOUT) {
            config.session.idle_timeout = parse_secs(IDLE_TIMEOUT, &value)?;
        }
        if let Some(path) = lookup(STORE_PATH) {
            if path.trim().is_empty() {
                return Err(ConfigError::Empty { var: STORE_PATH });
            }
            config.store_path = PathBuf::from(path.trim());
        }
        if let Some(value) = lookup(TOKENS) {
            config.tokens = parse_tokens(&value)?;
        }

        config.room = config.room.validated();
        Ok(config)
    }
}

/// Positive whole seconds.
fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds {
            var,
            value: value.to_string(),
        }),
    }
}

/// `token=userId` pairs separated by commas. Blank entries are skipped.
fn parse_tokens(value: &str) -> Result<Vec<(String, UserId)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidToken {
                var: TOKENS,
                entry: entry.to_string(),
            };
            let (token, user) = entry.split_once('=').ok_or_else(invalid)?;
            let user: u64 = user.trim().parse().map_err(|_| invalid())?;
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid());
            }
            Ok((token.to_string(), UserId(user)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.room.turn_timeout, Duration::from_secs(30));
        assert_eq!(cfg.room.rematch_window, Duration::from_secs(120));
        assert_eq!(cfg.session.idle_timeout, Duration::from_secs(60));
        assert_eq!(cfg.store_path, PathBuf::from("matches.jsonl"));
        assert!(cfg.tokens.is_empty());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("OMOK_BIND", "127.0.0.1:9000"),
            ("OMOK_TURN_TIMEOUT_SECS", "10"),
            ("OMOK_REMATCH_WINDOW_SECS", " 45 "),
            ("OMOK_IDLE_TIMEOUT_SECS", "90"),
            ("OMOK_STORE_PATH", "/tmp/omok.jsonl"),
            ("OMOK_TOKENS", "alice=1, bob=2,"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.room.turn_timeout, Duration::from_secs(10));
        assert_eq!(cfg.room.rematch_window, Duration::from_secs(45));
        assert_eq!(cfg.session.idle_timeout, Duration::from_secs(90));
        assert_eq!(cfg.store_path, PathBuf::from("/tmp/omok.jsonl"));
        assert_eq!(
            cfg.tokens,
            vec![("alice".to_string(), UserId(1)), ("bob".to_string(), UserId(2))]
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_seconds() {
        for bad in ["0", "-3", "ten", ""] {
            let err = ServerConfig::from_lookup(lookup(&[("OMOK_TURN_TIMEOUT_SECS", bad)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidSeconds { var: "OMOK_TURN_TIMEOUT_SECS", .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_lookup_rejects_malformed_tokens() {
        for bad in ["alice", "alice=x", "=3"] {
            let err = ServerConfig::from_lookup(lookup(&[("OMOK_TOKENS", bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidToken { .. }), "{bad:?}");
        }
    }

    #[test]
    fn test_from_lookup_rejects_empty_bind() {
        let err = ServerConfig::from_lookup(lookup(&[("OMOK_BIND", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { var: "OMOK_BIND" }));
    }
}
