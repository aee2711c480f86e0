//! Query construction: turns cleaned filter state plus platform capabilities
//! into either a historical query parameter set or a tail-endpoint
//! descriptor. Pure functions; validation happens here and nowhere else.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::filter::{FilterKey, FilterState};
use crate::types::{Platform, PlatformContext};

/// Default lookback window when no start date is set
const DEFAULT_LOOKBACK_HOURS: i64 = 1;

/// Parameter set for one bounded historical retrieval
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoricalQuery {
    pub platform: Platform,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl HistoricalQuery {
    /// Flatten into URL query pairs for the `/logs` endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("platform", self.platform.as_str().to_string()),
            ("start_time", self.start_time.clone()),
            ("end_time", self.end_time.clone()),
        ];
        if let Some(v) = &self.log_level {
            pairs.push(("log_level", v.clone()));
        }
        if let Some(v) = &self.log_group {
            pairs.push(("log_group", v.clone()));
        }
        if let Some(v) = &self.log_type {
            pairs.push(("log_type", v.clone()));
        }
        if let Some(v) = &self.keyword {
            pairs.push(("keyword", v.clone()));
        }
        if let Some(v) = &self.file_path {
            pairs.push(("file_path", v.clone()));
        }
        pairs
    }
}

/// The platform-specific parameter of a tail subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TailParam {
    LogGroup(String),
    LogType(String),
    FilePath(String),
}

impl TailParam {
    pub fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Self::LogGroup(v) => ("log_group_name", v),
            Self::LogType(v) => ("log_type", v),
            Self::FilePath(v) => ("file_path", v),
        }
    }
}

/// Descriptor for opening a push-stream subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TailEndpoint {
    pub platform: Platform,
    pub param: TailParam,
}

impl TailEndpoint {
    pub fn path(&self) -> String {
        format!("/logs/tail/{}", self.platform)
    }
}

fn require(filters: &FilterState, ctx: &PlatformContext) -> Result<()> {
    if let Some(field) = ctx.required_field() {
        if !filters.contains(field) {
            return Err(Error::MissingRequiredFilter {
                platform: ctx.id,
                field,
            });
        }
    }
    Ok(())
}

fn owned(filters: &FilterState, key: FilterKey) -> Option<String> {
    filters.get(key).map(str::to_string)
}

/// Build the parameter set for a historical fetch.
///
/// `now` is the caller's wall-clock time; start/end default to one hour ago
/// and now when absent from the filter state. A missing platform-required
/// field is an error and no query is produced.
pub fn historical_query(
    filters: &FilterState,
    ctx: &PlatformContext,
    now: DateTime<Utc>,
) -> Result<HistoricalQuery> {
    require(filters, ctx)?;

    let start_time = owned(filters, FilterKey::StartDate).unwrap_or_else(|| {
        (now - Duration::hours(DEFAULT_LOOKBACK_HOURS)).to_rfc3339_opts(SecondsFormat::Secs, true)
    });
    let end_time = owned(filters, FilterKey::EndDate)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true));

    Ok(HistoricalQuery {
        platform: ctx.id,
        start_time,
        end_time,
        log_level: owned(filters, FilterKey::Level),
        log_group: owned(filters, FilterKey::LogGroup),
        log_type: owned(filters, FilterKey::LogType),
        keyword: owned(filters, FilterKey::Keyword),
        file_path: owned(filters, FilterKey::FilePath),
    })
}

/// Build the descriptor for a tail subscription.
///
/// The endpoint parameter follows a fixed rule: cloud platforms tail by log
/// group, `local` by log type, `file` by file path.
pub fn tail_endpoint(filters: &FilterState, ctx: &PlatformContext) -> Result<TailEndpoint> {
    if !ctx.push_capable {
        return Err(Error::TailingUnsupported(ctx.id));
    }
    require(filters, ctx)?;

    let param = if ctx.requires_log_group {
        TailParam::LogGroup(owned(filters, FilterKey::LogGroup).unwrap_or_default())
    } else if ctx.requires_log_type {
        TailParam::LogType(owned(filters, FilterKey::LogType).unwrap_or_default())
    } else {
        TailParam::FilePath(owned(filters, FilterKey::FilePath).unwrap_or_default())
    };

    Ok(TailEndpoint {
        platform: ctx.id,
        param,
    })
}
