use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Mailbox-assigned message sequence number.
pub type EmailId = u32;

/// Inclusive calendar-date window a run is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ScanWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> anyhow::Result<Self> {
        if start > end {
            return Err(anyhow::anyhow!(
                "scan window start {start} is after end {end}"
            ));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// True when `day` is strictly older than the window start.
    pub fn is_before(&self, day: NaiveDate) -> bool {
        day < self.start
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Phrase for the window in prose: `on 2026-10-16` or
    /// `from 2026-10-14 to 2026-10-16`.
    pub fn period(&self) -> String {
        if self.is_single_day() {
            format!("on {}", self.start)
        } else {
            format!("from {} to {}", self.start, self.end)
        }
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}

/// A candidate message found by the scanner. `ordinal` is the position in
/// newest-first enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    pub id: EmailId,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailRecord {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub content: String,
}

/// Output of one retrieval run.
///
/// `total_received` and `total_sent` are counted before the blacklist is
/// applied, so `records.len()` may be smaller than `total_received`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalResult {
    pub records: Vec<EmailRecord>,
    pub total_received: usize,
    pub total_sent: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.total_received == 0 && self.total_sent == 0
    }
}
