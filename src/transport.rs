use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::piko::PORT;
use crate::prelude::*;

/// The gateway's embedded server answers within a second or not at all.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A full response for any command fits comfortably in one read.
const READ_BUFFER_SIZE: usize = 8192;

/// One synchronous send-then-receive exchange. The seam exists so the
/// query engine can be driven by a scripted transport in tests.
#[async_trait]
pub trait Transport: Send {
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Owns the single TCP connection to the inverter gateway for the whole
/// run. The protocol is connection-oriented per host; all bus addresses
/// share this one socket, queried strictly one at a time.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connects to the gateway on the protocol-fixed port. Connect
    /// failures are reported, never retried here; retry policy belongs to
    /// the query engine.
    pub async fn connect(host: &str) -> Result<Self> {
        let connect = TcpStream::connect((host, PORT));
        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::Connect {
                    host: host.to_string(),
                    port: PORT,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::Connect {
                    host: host.to_string(),
                    port: PORT,
                    reason: format!("timed out after {CONNECT_TIMEOUT:?}"),
                })
            }
        };
        debug!("connected to {host}:{PORT}");
        Ok(Self { stream })
    }

    /// Releases the socket. Dropping the transport does the same; this
    /// exists for the explicit teardown at the end of a run.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        debug!("tx {request:02x?}");
        self.stream.write_all(request).await?;

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = match tokio::time::timeout(READ_TIMEOUT, self.stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(Error::Io(e)),
            Err(_) => return Err(Error::Timeout(READ_TIMEOUT)),
        };
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "gateway closed the connection",
            )));
        }

        buf.truncate(n);
        debug!("rx {buf:02x?}");
        Ok(buf)
    }
}
