use std::sync::LazyLock;

use regex::Regex;

/// Start of a quoted reply chain or forwarded block. Everything from the first
/// match onward is dropped.
static REPLY_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\n-+\s*(?:Original Message|原始邮件)\s*-+",
        r"|\n-+\s*(?:Forwarded message|转发邮件)\s*-+",
        r"|On.*?wrote:",
        r"|在.*?写道：",
    ))
    .expect("static regex")
});

static SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n-- (?:\n|$)").expect("static regex"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("static regex"));

/// Strip reply chains, quoted lines and signatures from a message body.
pub fn clean_body(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace("&nbsp;", " ");
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let text = match REPLY_MARKER.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };

    let text = text
        .split('\n')
        .filter(|line| !line.trim().starts_with('>'))
        .collect::<Vec<_>>()
        .join("\n");

    let text = match SIGNATURE.find(&text) {
        Some(m) => &text[..m.start()],
        None => text.as_str(),
    };

    BLANK_RUN.replace_all(text.trim(), "\n\n").into_owned()
}
