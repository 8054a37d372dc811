use anyhow::Result;
use log::info;
use notify_rust::{Hint, Notification};

/// Delivers a finished digest to its reader.
pub trait PushSink: Send + Sync {
    fn push(&self, recipient: &str, text: &str) -> Result<()>;
}

pub struct StdoutPush;

impl PushSink for StdoutPush {
    fn push(&self, recipient: &str, text: &str) -> Result<()> {
        if !recipient.is_empty() {
            println!("To: {recipient}");
        }
        println!("{text}");
        Ok(())
    }
}

/// Desktop notification; the recipient is whoever is logged in.
pub struct DesktopPush;

impl PushSink for DesktopPush {
    fn push(&self, recipient: &str, text: &str) -> Result<()> {
        Notification::new()
            .summary("Mail digest")
            .body(text)
            .hint(Hint::Category("email".to_string()))
            .show()?;
        info!("digest shown as desktop notification (recipient {recipient:?})");
        Ok(())
    }
}
