pub mod cleaner;
pub mod decoders;
pub mod extract;
pub mod fetcher;
pub mod filter;
pub mod scanner;
pub mod session;

use std::time::Duration;

use log::{error, info};

use crate::domain::email::{RetrievalResult, ScanWindow};
use crate::error::MailError;
use crate::mail::filter::{Blacklist, aggregate};
use crate::mail::session::{Credentials, Mailbox, MailboxSession};

/// Everything one account's retrieval run needs.
#[derive(Clone)]
pub struct Retriever {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub max_scan: usize,
    pub timeout: Duration,
    pub blacklist: Blacklist,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("max_scan", &self.max_scan)
            .field("timeout", &self.timeout)
            .field("blacklist", &self.blacklist)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Run a retrieval; a fatal error is logged and yields an empty result.
    pub fn retrieve(&self, window: &ScanWindow) -> RetrievalResult {
        match self.try_retrieve(window) {
            Ok(result) => result,
            Err(e) => {
                error!("retrieval aborted: {e}");
                RetrievalResult::default()
            }
        }
    }

    pub fn try_retrieve(&self, window: &ScanWindow) -> Result<RetrievalResult, MailError> {
        let creds = Credentials {
            server: &self.server,
            port: self.port,
            user: &self.user,
            password: &self.password,
        };
        let mut session = MailboxSession::open(&creds, self.timeout)?;
        let result = retrieve_from(
            &mut session,
            window,
            self.max_scan,
            &self.user,
            &self.blacklist,
        );
        session.close();
        result
    }
}

/// Scan, fetch and aggregate against an already opened mailbox.
pub fn retrieve_from(
    mailbox: &mut dyn Mailbox,
    window: &ScanWindow,
    max_scan: usize,
    account: &str,
    blacklist: &Blacklist,
) -> Result<RetrievalResult, MailError> {
    info!(
        "retrieving mail for {} to {}",
        window.start(),
        window.end()
    );

    let scan = scanner::scan(mailbox, window, max_scan)?;
    if scan.handles.is_empty() {
        info!("no messages in window");
        return Ok(RetrievalResult::default());
    }

    let fetched = fetcher::fetch_all(mailbox, &scan.handles)?;
    let result = aggregate(fetched.records, account, blacklist);
    info!(
        "received {}, sent {}, kept {} records",
        result.total_received,
        result.total_sent,
        result.records.len()
    );
    Ok(result)
}
