use serde::{Deserialize, Serialize};

/// Tuning for [`SharingStore`](super::SharingStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Maximum entry-point resolutions in flight while reading a log
    pub resolve_concurrency: usize,
    /// Attempts at appending a record before giving up on a racing writer
    pub append_attempts: u32,
    /// Bytes of log parsed per step
    pub read_chunk_size: u64,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            resolve_concurrency: 16,
            append_attempts: 3,
            read_chunk_size: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SharingConfig = serde_json::from_str(r#"{"append_attempts": 7}"#).unwrap();
        assert_eq!(config.append_attempts, 7);
        assert_eq!(config.resolve_concurrency, 16);
        assert_eq!(config.read_chunk_size, 64 * 1024);
    }
}
