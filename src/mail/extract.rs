use std::sync::LazyLock;

use log::debug;
use mailparse::{DispositionType, ParsedMail};
use regex::Regex;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</\s*(?:script|style)\s*>")
        .expect("static regex")
});

// html2text wraps at this width; wide enough that paragraphs stay on one line
const HTML_RENDER_WIDTH: usize = 10_000;

/// Best-effort plain-text body of a parsed message.
///
/// The first non-attachment `text/plain` part wins; if it is empty, the first
/// `text/html` part is rendered to text instead.
pub fn extract_body(mail: &ParsedMail) -> String {
    let mut plain: Option<String> = None;
    let mut html: Option<String> = None;

    if is_multipart(mail) {
        for part in walk(mail) {
            if is_attachment(part) {
                continue;
            }
            match part.ctype.mimetype.to_ascii_lowercase().as_str() {
                "text/plain" if plain.is_none() => plain = decode_part(part),
                "text/html" if html.is_none() => html = decode_part(part),
                _ => {}
            }
        }
    } else {
        plain = decode_part(mail);
    }

    match (plain, html) {
        (Some(p), _) if !p.trim().is_empty() => p,
        (_, Some(h)) => html_to_text(&h),
        _ => String::new(),
    }
}

fn is_multipart(mail: &ParsedMail) -> bool {
    !mail.subparts.is_empty() || mail.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/")
}

/// Depth-first, pre-order walk over the part tree, root included.
fn walk<'a>(mail: &'a ParsedMail<'a>) -> Vec<&'a ParsedMail<'a>> {
    let mut out = vec![mail];
    for sp in &mail.subparts {
        out.extend(walk(sp));
    }
    out
}

fn is_attachment(part: &ParsedMail) -> bool {
    let disposition = part.get_content_disposition();
    matches!(disposition.disposition, DispositionType::Attachment)
        || disposition.params.contains_key("filename")
        || part.ctype.params.contains_key("name")
}

fn decode_part(part: &ParsedMail) -> Option<String> {
    match part.get_body() {
        Ok(body) => Some(body),
        Err(e) => {
            debug!("dropping undecodable {} part: {e}", part.ctype.mimetype);
            None
        }
    }
}

/// Render HTML to text: scripts and styles removed, one block per line,
/// whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let cleaned = SCRIPT_OR_STYLE.replace_all(html, "");
    let rendered = match html2text::config::plain_no_decorate()
        .string_from_read(cleaned.as_bytes(), HTML_RENDER_WIDTH)
    {
        Ok(text) => text,
        Err(e) => {
            debug!("html2text failed ({e}); returning empty body");
            return String::new();
        }
    };

    rendered
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(raw: &[u8]) -> String {
        let parsed = mailparse::parse_mail(raw).unwrap();
        extract_body(&parsed)
    }

    #[test]
    fn single_part_message_is_plain_text() {
        let raw = b"From: a@example.com\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nHello there\r\n";
        assert_eq!(body_of(raw).trim(), "Hello there");
    }

    #[test]
    fn plain_preferred_over_html() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/html\r\n\r\n<p>html version</p>\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nplain version\r\n",
            "--b--\r\n"
        );
        let body = body_of(raw.as_bytes());
        assert!(body.contains("plain version"));
        assert!(!body.contains("html version"));
    }

    #[test]
    fn first_plain_part_wins() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nfirst\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nsecond\r\n",
            "--b--\r\n"
        );
        let body = body_of(raw.as_bytes());
        assert!(body.contains("first"));
        assert!(!body.contains("second"));
    }

    #[test]
    fn html_used_when_plain_missing_and_scripts_removed() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/html\r\n\r\n",
            "<html><head><style>p { color: red; }</style></head><body>",
            "<script>alert('x')</script><p>Line one</p><p>Line   two</p></body></html>\r\n",
            "--b--\r\n"
        );
        let body = body_of(raw.as_bytes());
        assert!(body.contains("Line one"));
        assert!(body.contains("Line two"));
        assert!(!body.contains("alert"));
        assert!(!body.contains("color"));
        let one = body.find("Line one").unwrap();
        let two = body.find("Line two").unwrap();
        assert!(body[one..two].contains('\n'));
    }

    #[test]
    fn html_links_render_as_plain_text() {
        let text =
            html_to_text("<p>See <a href=\"https://example.com/x\">the report</a></p><p>Thanks</p>");
        assert!(text.contains("See the report"), "{text:?}");
        assert!(text.contains("Thanks"));
        assert!(!text.contains('['));
        assert!(!text.contains("https://example.com"));
    }

    #[test]
    fn attachments_are_skipped() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=\"notes.txt\"\r\n\r\nattached notes\r\n",
            "--b\r\nContent-Type: text/plain; name=\"other.txt\"\r\n\r\nnamed part\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nreal body\r\n",
            "--b--\r\n"
        );
        let body = body_of(raw.as_bytes());
        assert!(body.contains("real body"));
        assert!(!body.contains("attached notes"));
        assert!(!body.contains("named part"));
    }

    #[test]
    fn nested_multipart_is_walked() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"outer\"\r\n\r\n",
            "--outer\r\nContent-Type: multipart/alternative; boundary=\"inner\"\r\n\r\n",
            "--inner\r\nContent-Type: text/plain\r\n\r\nnested text\r\n",
            "--inner--\r\n",
            "--outer--\r\n"
        );
        assert!(body_of(raw.as_bytes()).contains("nested text"));
    }

    #[test]
    fn no_text_parts_yields_empty() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: image/png\r\n\r\nAAAA\r\n",
            "--b--\r\n"
        );
        assert_eq!(body_of(raw.as_bytes()), "");
    }

    #[test]
    fn empty_plain_falls_back_to_html() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\n",
            "--b\r\nContent-Type: text/html\r\n\r\n<div>from html</div>\r\n",
            "--b--\r\n"
        );
        assert!(body_of(raw.as_bytes()).contains("from html"));
    }
}
