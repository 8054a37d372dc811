use log::{debug, info, warn};

use crate::domain::email::{MessageHandle, ScanWindow};
use crate::error::MailError;
use crate::mail::decoders::date_from_header_block;
use crate::mail::session::Mailbox;

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Matching messages in discovery order (newest first).
    pub handles: Vec<MessageHandle>,
    pub examined: usize,
    pub skipped: usize,
    pub stopped_early: bool,
}

/// Phase 1: fetch only the `Date:` header of the newest `max_scan` messages
/// and keep those inside `window`.
///
/// Iteration runs newest to oldest and stops at the first message dated
/// before the window. That relies on the server enumerating messages in
/// arrival order; a mailbox reordered by moves or copies can end the scan
/// too soon.
pub fn scan(
    mailbox: &mut dyn Mailbox,
    window: &ScanWindow,
    max_scan: usize,
) -> Result<ScanReport, MailError> {
    let ids = mailbox.search_all()?;
    let mut report = ScanReport::default();
    if ids.is_empty() {
        info!("mailbox is empty");
        return Ok(report);
    }

    let recent = &ids[ids.len().saturating_sub(max_scan)..];
    info!(
        "mailbox holds {} messages, scanning the newest {}",
        ids.len(),
        recent.len()
    );

    for (ordinal, &id) in recent.iter().rev().enumerate() {
        report.examined += 1;

        let block = match mailbox.fetch_date_header(id) {
            Ok(Some(block)) => block,
            Ok(None) => {
                warn!("message {id}: empty date header response, skipping");
                report.skipped += 1;
                continue;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{e}, skipping");
                report.skipped += 1;
                continue;
            }
        };

        let Some(date) = date_from_header_block(&block) else {
            warn!("message {id}: missing or unparsable Date header, skipping");
            report.skipped += 1;
            continue;
        };

        if window.contains(date) {
            debug!("message {id} dated {date} is in window");
            report.handles.push(MessageHandle { id, ordinal });
        } else if window.is_before(date) {
            info!("message {id} dated {date} predates the window, stopping scan");
            report.stopped_early = true;
            break;
        }
    }

    info!(
        "scan matched {} of {} examined messages",
        report.handles.len(),
        report.examined
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::email::EmailId;

    #[derive(Default)]
    struct DateHeaderMailbox {
        dates: HashMap<EmailId, Result<Option<&'static str>, fn(EmailId) -> MailError>>,
        ids: Vec<EmailId>,
        header_fetches: Vec<EmailId>,
    }

    impl DateHeaderMailbox {
        fn with(mut self, id: EmailId, date: &'static str) -> Self {
            self.ids.push(id);
            self.dates.insert(id, Ok(Some(date)));
            self
        }

        fn failing(mut self, id: EmailId, err: fn(EmailId) -> MailError) -> Self {
            self.ids.push(id);
            self.dates.insert(id, Err(err));
            self
        }
    }

    impl Mailbox for DateHeaderMailbox {
        fn search_all(&mut self) -> Result<Vec<EmailId>, MailError> {
            let mut ids = self.ids.clone();
            ids.sort_unstable();
            Ok(ids)
        }

        fn fetch_date_header(&mut self, id: EmailId) -> Result<Option<Vec<u8>>, MailError> {
            self.header_fetches.push(id);
            match &self.dates[&id] {
                Ok(d) => Ok(d.map(|d| format!("Date: {d}\r\n\r\n").into_bytes())),
                Err(f) => Err(f(id)),
            }
        }

        fn fetch_message(&mut self, _id: EmailId) -> Result<Option<Vec<u8>>, MailError> {
            unreachable!("scanner never fetches full messages")
        }
    }

    fn oct(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn empty_mailbox_is_not_an_error() {
        let mut mb = DateHeaderMailbox::default();
        let report = scan(&mut mb, &ScanWindow::single_day(oct(16)), 200).unwrap();
        assert!(report.handles.is_empty());
        assert_eq!(report.examined, 0);
    }

    #[test]
    fn stops_at_first_message_before_window() {
        let mut mb = DateHeaderMailbox::default()
            .with(1, "Tue, 13 Oct 2026 10:00:00 +0000")
            .with(2, "Wed, 14 Oct 2026 10:00:00 +0000")
            .with(3, "Thu, 15 Oct 2026 10:00:00 +0000")
            .with(4, "Fri, 16 Oct 2026 09:00:00 +0000")
            .with(5, "Fri, 16 Oct 2026 10:00:00 +0000");
        let window = ScanWindow::single_day(oct(16));
        let report = scan(&mut mb, &window, 200).unwrap();

        let ids: Vec<_> = report.handles.iter().map(|h| h.id).collect();
        assert_eq!(ids, [5, 4]);
        assert_eq!(report.handles[0].ordinal, 0);
        assert!(report.stopped_early);
        // message 3 triggered the stop; 2 and 1 were never header_fetches
        assert_eq!(mb.header_fetches, [5, 4, 3]);
    }

    #[test]
    fn newer_than_window_is_skipped_without_stopping() {
        let mut mb = DateHeaderMailbox::default()
            .with(1, "Thu, 15 Oct 2026 10:00:00 +0000")
            .with(2, "Fri, 16 Oct 2026 10:00:00 +0000");
        let window = ScanWindow::single_day(oct(15));
        let report = scan(&mut mb, &window, 200).unwrap();
        assert_eq!(report.handles.iter().map(|h| h.id).collect::<Vec<_>>(), [1]);
        assert!(!report.stopped_early);
    }

    #[test]
    fn only_newest_max_scan_are_examined() {
        let mut mb = DateHeaderMailbox::default()
            .with(1, "Fri, 16 Oct 2026 07:00:00 +0000")
            .with(2, "Fri, 16 Oct 2026 08:00:00 +0000")
            .with(3, "Fri, 16 Oct 2026 09:00:00 +0000");
        let report = scan(&mut mb, &ScanWindow::single_day(oct(16)), 2).unwrap();
        assert_eq!(mb.header_fetches, [3, 2]);
        assert_eq!(report.handles.len(), 2);
    }

    #[test]
    fn bad_dates_and_header_fetch_failures_are_skipped() {
        let mut mb = DateHeaderMailbox::default()
            .with(1, "Fri, 16 Oct 2026 07:00:00 +0000")
            .with(2, "whenever")
            .failing(3, |id| MailError::DateHeader {
                id,
                reason: "NO".into(),
            })
            .with(4, "Fri, 16 Oct 2026 09:00:00 +0000");
        let report = scan(&mut mb, &ScanWindow::single_day(oct(16)), 200).unwrap();
        assert_eq!(report.handles.iter().map(|h| h.id).collect::<Vec<_>>(), [4, 1]);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn transport_timeout_aborts_the_scan() {
        let mut mb = DateHeaderMailbox::default()
            .with(1, "Fri, 16 Oct 2026 07:00:00 +0000")
            .failing(2, |_| MailError::Timeout("read timed out".into()));
        let err = scan(&mut mb, &ScanWindow::single_day(oct(16)), 200).unwrap_err();
        assert!(matches!(err, MailError::Timeout(_)));
    }
}
