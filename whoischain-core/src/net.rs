//! Raw WHOIS transport: send a query line over TCP, read until the server
//! closes the connection.

use std::io::{Read, Write};
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout_at;
use tracing::debug;

use crate::error::{Result, WhoisError};
use crate::hostname::HostName;
use crate::options::TextEncoding;

pub const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB

/// Fetches the raw text a WHOIS server returns for a query.
///
/// Implementations must be safe to call concurrently; a single fetcher is
/// shared by every strategy of a lookup engine.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch(
        &self,
        server: &HostName,
        port: u16,
        query: &str,
        encoding: TextEncoding,
        timeout: Duration,
    ) -> Result<String>;

    /// Blocking counterpart of [`fetch`](TextFetcher::fetch). Fetchers that
    /// only work inside a runtime keep the default, which refuses.
    fn fetch_blocking(
        &self,
        _server: &HostName,
        _port: u16,
        _query: &str,
        _encoding: TextEncoding,
        _timeout: Duration,
    ) -> Result<String> {
        Err(WhoisError::NotImplemented("blocking fetch"))
    }
}

/// [`TextFetcher`] speaking the plain WHOIS protocol over TCP.
#[derive(Debug, Clone)]
pub struct TcpFetcher {
    max_response_size: usize,
}

impl Default for TcpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpFetcher {
    pub fn new() -> Self {
        Self {
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }

    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    fn check_size(&self, server: &HostName, len: usize) -> Result<()> {
        if len > self.max_response_size {
            return Err(WhoisError::ResponseTooLarge {
                server: server.to_string(),
                limit: self.max_response_size,
            });
        }
        Ok(())
    }
}

/// Time left before `deadline`, or a timeout error naming `stage`.
fn remaining(deadline: Instant, server: &HostName, stage: &str) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(WhoisError::Timeout(format!("{} on {} timed out", stage, server)));
    }
    Ok(left)
}

/// Both conventions spend one `limit` across connect, write and read.
#[async_trait]
impl TextFetcher for TcpFetcher {
    async fn fetch(
        &self,
        server: &HostName,
        port: u16,
        query: &str,
        encoding: TextEncoding,
        limit: Duration,
    ) -> Result<String> {
        let deadline = tokio::time::Instant::now() + limit;

        let mut stream = timeout_at(deadline, TcpStream::connect((server.as_str(), port)))
            .await
            .map_err(|_| WhoisError::Timeout(format!("connect on {} timed out", server)))?
            .map_err(|e| WhoisError::network(server.as_str(), format!("connect: {}", e)))?;

        // Send query with CRLF
        let line = format!("{}\r\n", query);
        timeout_at(deadline, stream.write_all(line.as_bytes()))
            .await
            .map_err(|_| WhoisError::Timeout(format!("write on {} timed out", server)))?
            .map_err(|e| WhoisError::network(server.as_str(), format!("write: {}", e)))?;

        let read_all = async {
            let mut response = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream
                    .read(&mut buf)
                    .await
                    .map_err(|e| WhoisError::network(server.as_str(), format!("read: {}", e)))?;
                if n == 0 {
                    break;
                }
                response.extend_from_slice(&buf[..n]);
                self.check_size(server, response.len())?;
            }
            Ok::<_, WhoisError>(response)
        };

        let response = timeout_at(deadline, read_all)
            .await
            .map_err(|_| WhoisError::Timeout(format!("read on {} timed out", server)))??;

        debug!(server = %server, bytes = response.len(), "Downloaded WHOIS response");
        Ok(encoding.decode(response))
    }

    fn fetch_blocking(
        &self,
        server: &HostName,
        port: u16,
        query: &str,
        encoding: TextEncoding,
        limit: Duration,
    ) -> Result<String> {
        let deadline = Instant::now() + limit;
        // resolution has no timeout of its own; its time still counts
        let addrs = (server.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| WhoisError::network(server.as_str(), format!("resolve: {}", e)))?;

        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            let left = remaining(deadline, server, "connect")?;
            match std::net::TcpStream::connect_timeout(&addr, left) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let mut stream = match (connected, last_error) {
            (Some(stream), _) => stream,
            (None, Some(e)) => return Err(io_failure(server, "connect", e)),
            (None, None) => return Err(WhoisError::network(server.as_str(), "no addresses resolved")),
        };

        let left = remaining(deadline, server, "write")?;
        stream
            .set_write_timeout(Some(left))
            .and_then(|_| stream.write_all(format!("{}\r\n", query).as_bytes()))
            .map_err(|e| io_failure(server, "write", e))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let left = remaining(deadline, server, "read")?;
            stream
                .set_read_timeout(Some(left))
                .map_err(|e| io_failure(server, "read", e))?;

            let n = stream.read(&mut buf).map_err(|e| io_failure(server, "read", e))?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buf[..n]);
            self.check_size(server, response.len())?;
        }

        debug!(server = %server, bytes = response.len(), "Downloaded WHOIS response");
        Ok(encoding.decode(response))
    }
}

fn io_failure(server: &HostName, stage: &str, e: std::io::Error) -> WhoisError {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            WhoisError::Timeout(format!("{} on {} timed out", stage, server))
        }
        _ => WhoisError::network(server.as_str(), format!("{}: {}", stage, e)),
    }
}
