use log::{info, warn};
use mailparse::MailHeaderMap;

use crate::domain::email::{EmailId, EmailRecord, MessageHandle};
use crate::error::MailError;
use crate::mail::cleaner::clean_body;
use crate::mail::decoders::{DecodedText, decode_header_field};
use crate::mail::extract::extract_body;
use crate::mail::session::Mailbox;

#[derive(Debug, Default)]
pub struct FetchReport {
    pub records: Vec<EmailRecord>,
    /// Messages that could not be fetched or parsed.
    pub skipped: usize,
    /// Header fields kept in raw form because decoding failed.
    pub degraded_headers: usize,
}

/// Phase 2: download and transform every handle, in order. A message that
/// fails to fetch or parse is logged and skipped; only transport failures
/// end the batch.
pub fn fetch_all(
    mailbox: &mut dyn Mailbox,
    handles: &[MessageHandle],
) -> Result<FetchReport, MailError> {
    let mut report = FetchReport::default();
    let total = handles.len();

    for (i, handle) in handles.iter().enumerate() {
        info!("processing message {}/{} (id {})", i + 1, total, handle.id);

        let outcome = mailbox
            .fetch_message(handle.id)
            .and_then(|raw| {
                raw.ok_or_else(|| MailError::Fetch {
                    id: handle.id,
                    reason: "server returned no body".to_string(),
                })
            })
            .and_then(|raw| build_record(handle.id, &raw));

        match outcome {
            Ok((record, degraded)) => {
                info!("message {}: subject={:?}", handle.id, record.subject);
                report.degraded_headers += degraded;
                report.records.push(record);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{e}, skipping");
                report.skipped += 1;
            }
        }
    }

    info!(
        "fetched {} messages ({} skipped)",
        report.records.len(),
        report.skipped
    );
    Ok(report)
}

/// Parse raw RFC 822 bytes into a record. Also returns how many header
/// fields fell back to their raw form.
pub fn build_record(id: EmailId, raw: &[u8]) -> Result<(EmailRecord, usize), MailError> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| MailError::Parse {
        id,
        reason: e.to_string(),
    })?;

    let mut degraded = 0;
    let mut field = |name: &str| {
        let value = decode_header_field(&parsed.headers, name);
        if let DecodedText::Raw(raw) = &value {
            warn!("message {id}: could not decode {name} header, keeping raw {raw:?}");
            degraded += 1;
        }
        value.into_string()
    };

    let from = field("From");
    let to = field("To");
    let subject = field("Subject");
    let date = parsed.headers.get_first_value("Date").unwrap_or_default();
    let content = clean_body(&extract_body(&parsed));

    Ok((
        EmailRecord {
            from,
            to,
            subject,
            date,
            content,
        },
        degraded,
    ))
}
