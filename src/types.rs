//! Shared types for logscope
//!
//! Data structures used across the controller, the query builder, and the
//! transport layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::FilterKey;

// ============================================================================
// Log Records
// ============================================================================

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
    /// Anything the source reports that we don't recognize
    #[serde(other)]
    #[default]
    Unknown,
}

impl LogLevel {
    /// Parse log level from common formats
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "info" | "inf" | "information" => Self::Info,
            "warn" | "warning" | "wrn" => Self::Warn,
            "error" | "err" | "erro" => Self::Error,
            "debug" | "dbg" | "debg" => Self::Debug,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log record as delivered by a platform backend.
///
/// Immutable once received; buffer order is arrival order, which is not
/// guaranteed to be chronological.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO-8601 timestamp string, kept verbatim from the source
    pub timestamp: String,

    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub message: String,

    /// Originating log group, file, or service
    #[serde(default)]
    pub source: String,

    /// Platform-specific extra fields, passed through opaquely
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level,
            message: message.into(),
            source: source.into(),
            extra: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Platforms
// ============================================================================

/// A log platform the dashboard can read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Aws,
    Azure,
    Gcp,
    Els,
    Local,
    File,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Aws,
        Platform::Azure,
        Platform::Gcp,
        Platform::Els,
        Platform::Local,
        Platform::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::Els => "els",
            Self::Local => "local",
            Self::File => "file",
        }
    }

    /// Capability flags for this platform
    pub fn context(&self) -> PlatformContext {
        PlatformContext::of(*self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            "gcp" => Ok(Self::Gcp),
            "els" => Ok(Self::Els),
            "local" => Ok(Self::Local),
            "file" => Ok(Self::File),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// Static capability flags for a platform.
///
/// Derived from the platform id and never mutated; downstream code branches
/// on these flags instead of comparing platform strings, so adding a platform
/// means touching exactly one match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformContext {
    pub id: Platform,
    pub requires_log_group: bool,
    pub requires_log_type: bool,
    pub requires_file_path: bool,
    /// Whether the backend exposes a push stream for tailing
    pub push_capable: bool,
}

impl PlatformContext {
    pub fn of(id: Platform) -> Self {
        match id {
            Platform::Aws | Platform::Azure | Platform::Gcp | Platform::Els => Self {
                id,
                requires_log_group: true,
                requires_log_type: false,
                requires_file_path: false,
                push_capable: true,
            },
            Platform::Local => Self {
                id,
                requires_log_group: false,
                requires_log_type: true,
                requires_file_path: false,
                push_capable: true,
            },
            Platform::File => Self {
                id,
                requires_log_group: false,
                requires_log_type: false,
                requires_file_path: true,
                push_capable: true,
            },
        }
    }

    /// The filter key this platform cannot query without, if any
    pub fn required_field(&self) -> Option<FilterKey> {
        if self.requires_log_group {
            Some(FilterKey::LogGroup)
        } else if self.requires_log_type {
            Some(FilterKey::LogType)
        } else if self.requires_file_path {
            Some(FilterKey::FilePath)
        } else {
            None
        }
    }
}

// ============================================================================
// Platform catalog (external collaborator DTOs)
// ============================================================================

/// Platform descriptor returned by the catalog service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// Log group descriptor returned by the catalog service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogGroupInfo {
    pub name: String,
}

// ============================================================================
// Presentation-facing state
// ============================================================================

/// How the presentation layer renders the buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Table,
    Visual,
}

/// Controller status surfaced to the presentation layer
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    Loading,
    /// The backend rejected our credentials; the user must re-authenticate
    AuthRequired,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_wire_format_is_uppercase() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");

        let parsed: LogLevel = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(parsed, LogLevel::Error);

        // Unrecognized levels are preserved as Unknown, not an error
        let parsed: LogLevel = serde_json::from_str("\"NOTICE\"").unwrap();
        assert_eq!(parsed, LogLevel::Unknown);
    }

    #[test]
    fn log_record_keeps_extra_fields() {
        let json = r#"{
            "timestamp": "2024-01-15T10:30:00Z",
            "level": "INFO",
            "message": "started",
            "source": "app-logs",
            "request_id": "abc-123"
        }"#;
        let record: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(
            record.extra.get("request_id").and_then(|v| v.as_str()),
            Some("abc-123")
        );
    }

    #[test]
    fn required_field_follows_platform_capabilities() {
        assert_eq!(
            Platform::Aws.context().required_field(),
            Some(FilterKey::LogGroup)
        );
        assert_eq!(
            Platform::Local.context().required_field(),
            Some(FilterKey::LogType)
        );
        assert_eq!(
            Platform::File.context().required_field(),
            Some(FilterKey::FilePath)
        );
    }

    #[test]
    fn platform_parses_from_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
        assert!("s3".parse::<Platform>().is_err());
    }
}
