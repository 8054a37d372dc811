use log::info;

use crate::domain::email::{EmailRecord, RetrievalResult};

/// Lowercase sender-address fragments; a sender matches when its address
/// contains any fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    fragments: Vec<String>,
}

impl Blacklist {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fragments: Vec<String> = fragments
            .into_iter()
            .map(|f| f.as_ref().trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        fragments.sort();
        fragments.dedup();
        Self { fragments }
    }

    /// Parse a comma-delimited list, e.g. `"noreply@, spam.com"`.
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn matches(&self, sender: &str) -> bool {
        if self.fragments.is_empty() {
            return false;
        }
        let sender = sender.to_lowercase();
        self.fragments.iter().any(|f| sender.contains(f.as_str()))
    }
}

/// True when `from` contains the account's own address.
pub fn is_sent_by(account: &str, from: &str) -> bool {
    let account = account.trim().to_lowercase();
    !account.is_empty() && from.to_lowercase().contains(&account)
}

/// Split records into sent/received, count both, then drop blacklisted
/// senders from the received side. Counts are taken before the blacklist.
pub fn aggregate(
    records: Vec<EmailRecord>,
    account: &str,
    blacklist: &Blacklist,
) -> RetrievalResult {
    let (sent, received): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| is_sent_by(account, &r.from));

    let total_sent = sent.len();
    let total_received = received.len();

    let records = received
        .into_iter()
        .filter(|r| {
            if blacklist.matches(&r.from) {
                info!("dropping blacklisted sender {:?} ({:?})", r.from, r.subject);
                false
            } else {
                true
            }
        })
        .collect();

    RetrievalResult {
        records,
        total_received,
        total_sent,
    }
}
