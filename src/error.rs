use crate::domain::email::EmailId;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Authentication, protocol or transport failure on the session itself.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("transport timed out: {0}")]
    Timeout(String),

    #[error("date header fetch failed for message {id}: {reason}")]
    DateHeader { id: EmailId, reason: String },

    #[error("fetch failed for message {id}: {reason}")]
    Fetch { id: EmailId, reason: String },

    #[error("could not parse message {id}: {reason}")]
    Parse { id: EmailId, reason: String },
}

impl MailError {
    /// Fatal errors end the whole run; the rest only cost one message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailError::Connection(_) | MailError::Timeout(_))
    }

    /// Map a transport-level error into the taxonomy. `per_message` builds the
    /// variant used when the server rejected a single command.
    pub(crate) fn from_imap(
        err: imap::error::Error,
        per_message: impl FnOnce(String) -> MailError,
    ) -> MailError {
        match err {
            imap::error::Error::Io(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                MailError::Timeout(e.to_string())
            }
            imap::error::Error::Io(e) => MailError::Connection(e.to_string()),
            imap::error::Error::ConnectionLost => {
                MailError::Connection("connection lost".to_string())
            }
            imap::error::Error::Tls(e) => MailError::Connection(e.to_string()),
            other => per_message(other.to_string()),
        }
    }
}
