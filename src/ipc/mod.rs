use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

// Guards against a garbage length prefix allocating gigabytes.
const MAX_FRAME: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Ping,
    /// Run a digest now; `date` is YYYY-MM-DD, defaulting to today.
    RunDigest { date: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub message: Option<String>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

pub fn socket_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir"))?
        .join("mail_digest");
    std::fs::create_dir_all(&base)?;
    Ok(base.join("daemon.sock"))
}

/// Write one length-prefixed JSON frame.
pub fn write_frame<W: Write, T: Serialize>(w: &mut W, value: &T) -> Result<()> {
    let data = serde_json::to_vec(value)?;
    w.write_all(&(data.len() as u32).to_be_bytes())?;
    w.write_all(&data)?;
    w.flush()?;
    Ok(())
}

pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(r: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let n = u32::from_be_bytes(len_buf) as usize;
    if n > MAX_FRAME {
        return Err(anyhow::anyhow!("IPC frame of {n} bytes exceeds limit"));
    }
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}

#[cfg(unix)]
pub fn send(req: &Request) -> Result<Response> {
    let path = socket_path()?;
    let mut s = UnixStream::connect(&path).map_err(|e| {
        anyhow::anyhow!("daemon not reachable at {}: {e}", path.display())
    })?;
    write_frame(&mut s, req)?;
    read_frame(&mut s)
}

#[cfg(not(unix))]
pub fn send(_req: &Request) -> Result<Response> {
    Ok(Response::err("IPC not supported on this platform"))
}

/// Accept connections forever, answering each request with `handler`.
#[cfg(unix)]
pub fn serve<F>(handler: F) -> Result<()>
where
    F: Fn(Request) -> Response,
{
    let path = socket_path()?;
    if path.exists() {
        // stale socket from a previous daemon
        std::fs::remove_file(&path)?;
    }
    let listener = UnixListener::bind(&path)?;
    log::info!("IPC listening on {}", path.display());

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::warn!("IPC accept failed: {e}");
                continue;
            }
        };
        let response = match read_frame::<_, Request>(&mut stream) {
            Ok(req) => handler(req),
            Err(e) => Response::err(format!("bad request: {e}")),
        };
        if let Err(e) = write_frame(&mut stream, &response) {
            log::warn!("IPC reply failed: {e}");
        }
    }
    Ok(())
}
