use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};
use native_tls::{TlsConnector, TlsStream};

use crate::domain::email::EmailId;
use crate::error::MailError;

const DATE_HEADER_QUERY: &str = "BODY.PEEK[HEADER.FIELDS (DATE)]";
const FULL_MESSAGE_QUERY: &str = "BODY.PEEK[]";

/// The three mailbox operations a retrieval run needs.
///
/// Per-message failures come back as non-fatal [`MailError`] variants;
/// transport failures as [`MailError::Connection`] / [`MailError::Timeout`].
pub trait Mailbox {
    /// All message ids in the selected folder, ascending (oldest first).
    fn search_all(&mut self) -> Result<Vec<EmailId>, MailError>;

    /// Raw header block holding only the `Date:` field.
    fn fetch_date_header(&mut self, id: EmailId) -> Result<Option<Vec<u8>>, MailError>;

    /// Complete RFC 822 source of one message.
    fn fetch_message(&mut self, id: EmailId) -> Result<Option<Vec<u8>>, MailError>;
}

pub struct Credentials<'a> {
    pub server: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
}

/// Restores the socket's previous timeouts when dropped.
struct TimeoutGuard {
    socket: TcpStream,
    prior_read: Option<Duration>,
    prior_write: Option<Duration>,
}

impl TimeoutGuard {
    fn install(socket: &TcpStream, timeout: Duration) -> std::io::Result<Self> {
        let socket = socket.try_clone()?;
        let prior_read = socket.read_timeout()?;
        let prior_write = socket.write_timeout()?;
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;
        Ok(Self {
            socket,
            prior_read,
            prior_write,
        })
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        let restored = self
            .socket
            .set_read_timeout(self.prior_read)
            .and_then(|_| self.socket.set_write_timeout(self.prior_write));
        if let Err(e) = restored {
            debug!("could not restore socket timeouts: {e}");
        }
    }
}

/// An authenticated IMAP session with INBOX selected.
///
/// Logout and timeout restoration run on drop, so they happen on every exit
/// path including early returns and panics.
pub struct MailboxSession {
    session: imap::Session<TlsStream<TcpStream>>,
    _timeout: TimeoutGuard,
}

impl MailboxSession {
    pub fn open(creds: &Credentials<'_>, timeout: Duration) -> Result<Self, MailError> {
        info!("Connecting to {}:{}", creds.server, creds.port);
        let socket = connect_tcp(creds.server, creds.port, timeout)?;
        let guard = TimeoutGuard::install(&socket, timeout).map_err(io_error)?;

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Connection(format!("tls setup: {e}")))?;
        let stream = tls
            .connect(creds.server, socket)
            .map_err(|e| MailError::Connection(format!("tls handshake: {e}")))?;

        let mut client = imap::Client::new(stream);
        client
            .read_greeting()
            .map_err(|e| MailError::from_imap(e, MailError::Connection))?;

        let mut session = client
            .login(creds.user, creds.password)
            .map_err(|(e, _client)| match e {
                imap::error::Error::No(msg) | imap::error::Error::Bad(msg) => {
                    MailError::Connection(format!("authentication failed: {msg}"))
                }
                other => MailError::from_imap(other, MailError::Connection),
            })?;

        // From here on `Self` owns the session, so a failed SELECT still logs out.
        let mailbox = session.select("INBOX");
        let this = Self {
            session,
            _timeout: guard,
        };
        let mailbox = mailbox.map_err(|e| {
            MailError::from_imap(e, |m| MailError::Connection(format!("select INBOX: {m}")))
        })?;
        info!("INBOX selected ({} messages)", mailbox.exists);
        Ok(this)
    }

    /// Log out now instead of waiting for drop.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for MailboxSession {
    fn drop(&mut self) {
        match self.session.logout() {
            Ok(()) => info!("IMAP session closed"),
            Err(e) => warn!("IMAP logout failed: {e}"),
        }
    }
}

impl Mailbox for MailboxSession {
    fn search_all(&mut self) -> Result<Vec<EmailId>, MailError> {
        let found = self
            .session
            .search("ALL")
            .map_err(|e| MailError::from_imap(e, |m| MailError::Connection(format!("search: {m}"))))?;
        let mut ids: Vec<EmailId> = found.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_date_header(&mut self, id: EmailId) -> Result<Option<Vec<u8>>, MailError> {
        let fetches = self
            .session
            .fetch(id.to_string(), DATE_HEADER_QUERY)
            .map_err(|e| MailError::from_imap(e, |reason| MailError::DateHeader { id, reason }))?;
        Ok(fetches.iter().next().and_then(|f| {
            f.header()
                .or_else(|| f.body())
                .or_else(|| f.text())
                .map(|b| b.to_vec())
        }))
    }

    fn fetch_message(&mut self, id: EmailId) -> Result<Option<Vec<u8>>, MailError> {
        let fetches = self
            .session
            .fetch(id.to_string(), FULL_MESSAGE_QUERY)
            .map_err(|e| MailError::from_imap(e, |reason| MailError::Fetch { id, reason }))?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .map(|b| b.to_vec()))
    }
}

fn connect_tcp(server: &str, port: u16, timeout: Duration) -> Result<TcpStream, MailError> {
    let addrs = (server, port)
        .to_socket_addrs()
        .map_err(|e| MailError::Connection(format!("resolve {server}: {e}")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(s) => return Ok(s),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => io_error(e),
        None => MailError::Connection(format!("no addresses for {server}")),
    })
}

fn io_error(e: std::io::Error) -> MailError {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            MailError::Timeout(e.to_string())
        }
        _ => MailError::Connection(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    fn loopback_pair() -> (TcpListener, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        (listener, stream)
    }

    #[test]
    fn timeout_guard_applies_and_reverts() {
        let (_listener, stream) = loopback_pair();
        assert_eq!(stream.read_timeout().unwrap(), None);
        assert_eq!(stream.write_timeout().unwrap(), None);

        {
            let _guard = TimeoutGuard::install(&stream, Duration::from_secs(7)).unwrap();
            assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(7)));
            assert_eq!(stream.write_timeout().unwrap(), Some(Duration::from_secs(7)));
        }

        assert_eq!(stream.read_timeout().unwrap(), None);
        assert_eq!(stream.write_timeout().unwrap(), None);
    }

    #[test]
    fn timeout_guard_restores_existing_timeouts() {
        let (_listener, stream) = loopback_pair();
        stream.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
        stream.set_write_timeout(Some(Duration::from_secs(4))).unwrap();

        let guard = TimeoutGuard::install(&stream, Duration::from_secs(7)).unwrap();
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(7)));
        drop(guard);

        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(3)));
        assert_eq!(stream.write_timeout().unwrap(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn timed_out_io_maps_to_timeout() {
        let e = io_error(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(matches!(e, MailError::Timeout(_)));
        let e = io_error(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(matches!(e, MailError::Connection(_)));
    }
}
