//! Utility functions for docshard

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest key accepted by the store
pub const MAX_KEY_LEN: usize = 1024;

/// Parse duration string (e.g., "500ms", "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else {
        let split = s.len() - s.chars().last().map_or(0, |c| c.len_utf8());
        (&s[..split], &s[split..])
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(std::time::Duration::from_millis(num)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => {
            return Err(crate::Error::InvalidConfig(format!(
                "unknown duration unit: {}",
                unit
            )))
        }
    };

    num.checked_mul(secs_per_unit)
        .map(std::time::Duration::from_secs)
        .ok_or_else(|| crate::Error::InvalidConfig(format!("duration out of range: {}", s)))
}

/// Current Unix timestamp (microseconds)
pub fn timestamp_now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}

/// Generate a key for a document inserted without one.
///
/// Keys look like `doc_<micros>`; the value never goes backwards and never
/// repeats within a process, even when called from several threads in the
/// same microsecond.
pub fn generate_document_key() -> String {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = timestamp_now_micros();
    let prev = match LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(prev) | Err(prev) => prev,
    };

    format!("doc_{}", now.max(prev + 1))
}

/// Calculate CRC32 checksum
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate key (must be non-empty, reasonable length, no control chars)
pub fn validate_key(key: &str) -> crate::Result<()> {
    if key.is_empty() {
        return Err(crate::Error::InvalidKey("key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(crate::Error::InvalidKey(format!(
            "key too long (max {} bytes)",
            MAX_KEY_LEN
        )));
    }

    if key.chars().any(|c| c.is_control()) {
        return Err(crate::Error::InvalidKey(
            "key contains invalid characters".into(),
        ));
    }

    Ok(())
}

/// Storage node state as seen by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Passed the startup probe; reads and writes go through.
    Available,
    /// Failed to connect or to answer the probe at startup.
    Unavailable,
    /// Handle released by `close()`.
    Closed,
}

impl NodeState {
    pub fn is_available(&self) -> bool {
        matches!(self, NodeState::Available)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Available => write!(f, "available"),
            NodeState::Unavailable => write!(f, "unavailable"),
            NodeState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            parse_duration("500ms").unwrap(),
            std::time::Duration::from_millis(500)
        );
        assert_eq!(
            parse_duration("5s").unwrap(),
            std::time::Duration::from_secs(5)
        );
        assert_eq!(
            parse_duration("2m").unwrap(),
            std::time::Duration::from_secs(120)
        );
        assert_eq!(
            parse_duration("1h").unwrap(),
            std::time::Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("é").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let max = u64::MAX.to_string();
        assert!(matches!(
            parse_duration(&format!("{}h", max)),
            Err(crate::Error::InvalidConfig(_))
        ));
        assert!(parse_duration(&format!("{}m", u64::MAX / 59)).is_err());
        assert_eq!(
            parse_duration(&format!("{}s", max)).unwrap(),
            std::time::Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn test_generated_keys_increase() {
        let keys: Vec<u64> = (0..1000)
            .map(|_| {
                generate_document_key()
                    .trim_start_matches("doc_")
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_generated_keys_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..500).map(|_| generate_document_key()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(seen.insert(key), "duplicate generated key");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("doc_0001").is_ok());
        assert!(validate_key("path/to/doc").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"x".repeat(2000)).is_err());
        assert!(validate_key("bad\nkey").is_err());
    }

    #[test]
    fn test_node_state() {
        assert!(NodeState::Available.is_available());
        assert!(!NodeState::Unavailable.is_available());
        assert_eq!(NodeState::Closed.to_string(), "closed");
    }
}
