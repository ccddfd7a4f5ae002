//! Memo settings model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default limit policy applied to a fresh record.
pub const DEFAULT_LIMIT_VALUE: u32 = 200;

/// Unit used to measure the memo body against its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LimitType {
    /// Unicode scalar values
    #[default]
    Char,
    /// UTF-8 encoded bytes
    Byte,
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char => f.write_str("CHAR"),
            Self::Byte => f.write_str("BYTE"),
        }
    }
}

impl FromStr for LimitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHAR" | "CHARS" => Ok(Self::Char),
            "BYTE" | "BYTES" => Ok(Self::Byte),
            other => Err(format!("unknown limit type '{other}' (expected CHAR or BYTE)")),
        }
    }
}

/// Settings synchronized alongside the memo body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// How the body length is measured
    #[serde(default)]
    pub limit_type: LimitType,
    /// Maximum allowed usage in `limit_type` units
    #[serde(default = "default_limit_value")]
    pub limit_value: u32,
}

impl Settings {
    #[must_use]
    pub const fn new(limit_type: LimitType, limit_value: u32) -> Self {
        Self {
            limit_type,
            limit_value,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(LimitType::Char, DEFAULT_LIMIT_VALUE)
    }
}

const fn default_limit_value() -> u32 {
    DEFAULT_LIMIT_VALUE
}
