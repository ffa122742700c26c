//! Feature Layout - Column order of the scorer input
//!
//! Bump `FEATURE_VERSION` whenever a column is added, removed or moved.
//! Model artifacts carry the version and a CRC32 of the column names, so a
//! model fitted on another layout fails to load and gets retrained.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

pub const FEATURE_VERSION: u8 = 1;

/// Column names, in vector order
pub const FEATURE_LAYOUT: &[&str] = &[
    "packet_count",
    "total_bytes",
    "packet_rate",
    "avg_packet_size",
    "distinct_port_count", // no port on events, always 0
];

pub const FEATURE_COUNT: usize = FEATURE_LAYOUT.len();

/// CRC32 over the version byte and the NUL-terminated column names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Layout stamp written next to a persisted model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub features: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            features: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: built for v{} ({:08x}), current is v{} ({:08x})",
            self.actual_version, self.actual_hash, self.expected_version, self.expected_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Accept only the current version and hash
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let expected_hash = layout_hash();
    if version == FEATURE_VERSION && hash == expected_hash {
        return Ok(());
    }
    Err(LayoutMismatchError {
        expected_version: FEATURE_VERSION,
        expected_hash,
        actual_version: version,
        actual_hash: hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_columns() {
        assert_eq!(FEATURE_COUNT, 5);
        assert_eq!(LayoutInfo::current().features.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_hash_depends_on_names() {
        let mut hasher = Hasher::new();
        hasher.update(&[FEATURE_VERSION]);
        hasher.update(b"packet_count\0");
        assert_ne!(layout_hash(), hasher.finalize());
        assert_eq!(layout_hash(), LayoutInfo::current().hash);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());

        let err = validate_layout(FEATURE_VERSION + 1, layout_hash()).unwrap_err();
        assert_eq!(err.actual_version, FEATURE_VERSION + 1);
        assert!(err.to_string().contains("current is v1"));

        assert!(validate_layout(FEATURE_VERSION, !layout_hash()).is_err());
    }
}
