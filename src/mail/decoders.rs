use chrono::{DateTime, NaiveDate};
use mailparse::{MailHeader, MailHeaderMap};

/// A header value after RFC 2047 decoding. `Raw` means decoding failed and
/// the undecoded text is carried instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedText {
    Decoded(String),
    Raw(String),
}

impl DecodedText {
    pub fn is_degraded(&self) -> bool {
        matches!(self, DecodedText::Raw(_))
    }

    pub fn into_string(self) -> String {
        match self {
            DecodedText::Decoded(s) | DecodedText::Raw(s) => s,
        }
    }
}

pub fn decode_mime_words(raw: &[u8]) -> DecodedText {
    // mailparse expects a full "Key: value" header line
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    let fallback = || DecodedText::Raw(String::from_utf8_lossy(raw).trim().to_string());
    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => {
            let value = h.get_value();
            if has_undecoded_words(raw, &value) || value.contains('\u{FFFD}') {
                fallback()
            } else {
                DecodedText::Decoded(value.trim().to_string())
            }
        }
        Err(_) => fallback(),
    }
}

/// mailparse leaves encoded-words it could not decode untouched.
fn has_undecoded_words(raw: &[u8], decoded: &str) -> bool {
    let raw = String::from_utf8_lossy(raw);
    raw.contains("=?") && decoded.contains("=?") && decoded.contains("?=")
}

/// Decode the first header named `name`; an absent header decodes to "".
pub fn decode_header_field(headers: &[MailHeader], name: &str) -> DecodedText {
    match headers.get_first_header(name) {
        Some(h) => decode_mime_words(h.get_value_raw()),
        None => DecodedText::Decoded(String::new()),
    }
}

/// Calendar date of an RFC 2822 `Date:` value, in the sender's own offset.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(strip_trailing_comment(value)) {
        return Some(dt.date_naive());
    }
    // Looser parser for real-world variants (missing weekday, odd zones, ...).
    // It answers 0 for anything it cannot read.
    match mailparse::dateparse(value) {
        Ok(epoch) if epoch != 0 => DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// `"... +0000 (UTC)"` -> `"... +0000"`
fn strip_trailing_comment(value: &str) -> &str {
    match value.strip_suffix(')').and_then(|v| v.rfind('(')) {
        Some(open) => value[..open].trim_end(),
        None => value,
    }
}

/// Extract and parse the `Date:` header out of a header-only fetch response.
pub fn date_from_header_block(block: &[u8]) -> Option<NaiveDate> {
    let (headers, _) = mailparse::parse_headers(block).ok()?;
    let value = headers.get_first_value("Date")?;
    parse_date(&value)
}
