pub mod job;
pub mod push;
pub mod summarizer;

use log::error;

use crate::domain::email::{EmailRecord, RetrievalResult, ScanWindow};

const SNIPPET_CHARS: usize = 200;

/// What a summarizer gets to see.
pub struct DigestInput<'a> {
    pub window: ScanWindow,
    pub records: &'a [EmailRecord],
    pub total_received: usize,
    pub total_sent: usize,
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, input: &DigestInput<'_>) -> anyhow::Result<String>;
}

/// Pick the digest text for a run. The summarizer is only consulted when
/// there are received records left after filtering.
pub fn compose_digest(
    window: &ScanWindow,
    result: &RetrievalResult,
    summarizer: Option<&dyn Summarizer>,
) -> String {
    if result.total_received + result.total_sent == 0 {
        return format!("{window}: no new mail.");
    }

    let counts = format!(
        "Received {} emails and sent {} {}.",
        result.total_received,
        result.total_sent,
        window.period()
    );
    if result.records.is_empty() {
        return format!("{counts} No external mail needs review.");
    }

    let input = DigestInput {
        window: *window,
        records: &result.records,
        total_received: result.total_received,
        total_sent: result.total_sent,
    };
    match summarizer {
        Some(s) => match s.summarize(&input) {
            Ok(text) => text,
            Err(e) => {
                error!("summarizer failed: {e:#}");
                format!("AI summary failed: {e}")
            }
        },
        None => format!("{counts}\n\n{}", format_records(input.records)),
    }
}

/// One block per record: sender, subject and the first 200 characters of
/// the cleaned body.
pub fn format_records(records: &[EmailRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "Email {}:\nFrom: {}\nSubject: {}\nSummary: {}\n",
                i + 1,
                or_placeholder(&r.from, "(unknown)"),
                or_placeholder(&r.subject, "(no subject)"),
                snippet(&r.content, SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

pub fn snippet(content: &str, max_chars: usize) -> String {
    let mut out: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    struct Canned(anyhow::Result<&'static str>);

    impl Summarizer for Canned {
        fn summarize(&self, input: &DigestInput<'_>) -> anyhow::Result<String> {
            assert!(!input.records.is_empty());
            match &self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn oct(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn today() -> ScanWindow {
        ScanWindow::single_day(oct(16))
    }

    fn last_three_days() -> ScanWindow {
        ScanWindow::new(oct(14), oct(16)).unwrap()
    }

    fn one_record() -> RetrievalResult {
        RetrievalResult {
            records: vec![EmailRecord {
                from: "Alice <alice@example.org>".into(),
                subject: "Budget".into(),
                content: "Please review".into(),
                ..Default::default()
            }],
            total_received: 1,
            total_sent: 0,
        }
    }

    #[test]
    fn no_mail_at_all() {
        let text = compose_digest(&today(), &RetrievalResult::default(), None);
        assert_eq!(text, "2026-10-16: no new mail.");

        let text = compose_digest(&last_three_days(), &RetrievalResult::default(), None);
        assert_eq!(text, "2026-10-14 to 2026-10-16: no new mail.");
    }

    #[test]
    fn only_filtered_or_sent_mail() {
        let result = RetrievalResult {
            records: vec![],
            total_received: 2,
            total_sent: 1,
        };
        let summarizer = Canned(Ok("unused"));
        let text = compose_digest(&today(), &result, Some(&summarizer as &dyn Summarizer));
        assert_eq!(
            text,
            "Received 2 emails and sent 1 on 2026-10-16. No external mail needs review."
        );
    }

    #[test]
    fn summarizer_output_is_used() {
        let summarizer = Canned(Ok("1. Budget - reply needed"));
        let text = compose_digest(&today(), &one_record(), Some(&summarizer as &dyn Summarizer));
        assert_eq!(text, "1. Budget - reply needed");
    }

    #[test]
    fn summarizer_failure_is_reported_in_text() {
        let summarizer = Canned(Err(anyhow::anyhow!("HTTP 503")));
        let text = compose_digest(&today(), &one_record(), Some(&summarizer as &dyn Summarizer));
        assert_eq!(text, "AI summary failed: HTTP 503");
    }

    #[test]
    fn without_summarizer_records_are_listed() {
        let text = compose_digest(&today(), &one_record(), None);
        assert!(text.starts_with("Received 1 emails and sent 0 on 2026-10-16."));
        assert!(text.contains("From: Alice <alice@example.org>"));
        assert!(text.contains("Summary: Please review"));
    }

    #[test]
    fn range_window_names_both_ends() {
        let text = compose_digest(&last_three_days(), &one_record(), None);
        assert!(text.starts_with("Received 1 emails and sent 0 from 2026-10-14 to 2026-10-16."));
        assert!(!text.contains("today"));
    }

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        let long = "邮".repeat(250);
        let s = snippet(&long, 200);
        assert_eq!(s.chars().count(), 203);
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short", 200), "short");
    }
}
