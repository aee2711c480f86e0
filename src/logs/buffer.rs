use crate::types::{LogLevel, LogRecord};

/// Ordered in-memory sequence of log records.
///
/// Append-only while tailing, fully replaced on each historical fetch.
/// Exclusively owned and mutated by the controller; record order is arrival
/// order from the source.
#[derive(Debug, Default)]
pub struct LogBuffer {
    records: Vec<LogRecord>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole buffer with a historical result set
    pub fn replace(&mut self, records: Vec<LogRecord>) {
        self.records = records;
    }

    /// Append one record in arrival order
    pub fn append(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = LogRecord>) {
        self.records.extend(records);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Count records at a given level (for the visual view)
    pub fn count_level(&self, level: LogLevel) -> usize {
        self.records.iter().filter(|r| r.level == level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> LogRecord {
        LogRecord::new(
            format!("2024-01-15T10:00:{:02}Z", n % 60),
            LogLevel::Info,
            format!("message {}", n),
            "test",
        )
    }

    #[test]
    fn replace_discards_previous_contents() {
        let mut buffer = LogBuffer::new();
        buffer.append(record(1));
        buffer.append(record(2));
        buffer.replace(vec![record(3)]);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.records()[0].message, "message 3");
    }

    #[test]
    fn count_level_counts_only_matching_records() {
        let mut buffer = LogBuffer::new();
        buffer.append(record(1));
        let mut error = record(2);
        error.level = LogLevel::Error;
        buffer.append(error.clone());
        buffer.append(error);

        assert_eq!(buffer.count_level(LogLevel::Info), 1);
        assert_eq!(buffer.count_level(LogLevel::Error), 2);
        assert_eq!(buffer.count_level(LogLevel::Warn), 0);
    }

    #[test]
    fn append_preserves_arrival_order() {
        let mut buffer = LogBuffer::new();
        for n in 0..5 {
            buffer.append(record(n));
        }
        let messages: Vec<_> = buffer.records().iter().map(|r| r.message.as_str()).collect();
        assert_eq!(
            messages,
            ["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
    }
}
