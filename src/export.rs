//! Buffer export to downloadable artifacts.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::types::LogRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Opaque "save bytes as file" collaborator
pub trait DownloadSink {
    fn save(&self, bytes: &[u8], mime: &str, filename: &str) -> std::io::Result<()>;
}

/// Writes exported artifacts into a directory
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for FileSink {
    fn save(&self, bytes: &[u8], _mime: &str, filename: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(filename), bytes)
    }
}

/// Serialize records into the requested format
pub fn export(records: &[LogRecord], format: ExportFormat) -> Vec<u8> {
    match format {
        ExportFormat::Json => serde_json::to_vec_pretty(records).unwrap_or_default(),
        ExportFormat::Csv => to_csv(records).into_bytes(),
    }
}

/// CSV rendering with the header row derived from the first record's key set
fn to_csv(records: &[LogRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let extra_keys: Vec<&str> = first.extra.keys().map(String::as_str).collect();
    let mut out = String::new();

    let header: Vec<&str> = ["timestamp", "level", "message", "source"]
        .into_iter()
        .chain(extra_keys.iter().copied())
        .collect();
    push_row(&mut out, header.iter().map(|s| s.to_string()));

    for record in records {
        let extras = extra_keys.iter().map(|key| {
            record
                .extra
                .get(*key)
                .map(|value| match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        });
        let fields = [
            record.timestamp.clone(),
            record.level.as_str().to_string(),
            record.message.clone(),
            record.source.clone(),
        ]
        .into_iter()
        .chain(extras);
        push_row(&mut out, fields);
    }

    out
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let row: Vec<String> = fields.map(|f| csv_escape(&f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    fn records() -> Vec<LogRecord> {
        let mut a = LogRecord::new("2024-01-15T10:00:00Z", LogLevel::Info, "started", "syslog");
        a.extra.insert(
            "host".to_string(),
            serde_json::Value::String("web-1".to_string()),
        );
        let b = LogRecord::new(
            "2024-01-15T10:00:01Z",
            LogLevel::Error,
            "boom, with commas",
            "syslog",
        );
        vec![a, b]
    }

    #[test]
    fn csv_header_comes_from_the_first_record() {
        let csv = String::from_utf8(export(&records(), ExportFormat::Csv)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,level,message,source,host"));
        assert_eq!(
            lines.next(),
            Some("2024-01-15T10:00:00Z,INFO,started,syslog,web-1")
        );
        // Commas force quoting; a missing extra renders as empty
        assert_eq!(
            lines.next(),
            Some("2024-01-15T10:00:01Z,ERROR,\"boom, with commas\",syslog,")
        );
    }

    #[test]
    fn csv_of_empty_buffer_is_empty() {
        assert!(export(&[], ExportFormat::Csv).is_empty());
    }

    #[test]
    fn json_round_trips() {
        let bytes = export(&records(), ExportFormat::Json);
        let parsed: Vec<LogRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, records());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(f) if f == "xml"));
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("plain"), "plain");
    }
}
