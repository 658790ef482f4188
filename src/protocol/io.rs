//! Transport boundary and the tokio TCP implementation.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::error::{Result, SwitcherError};

/// Duplex byte channel a client sends packets over.
///
/// A read returning no bytes means the peer sent nothing back.
pub trait Transport {
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;
    fn read(&mut self, max_bytes: usize) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Write packet to stream with timeout.
pub(crate) async fn write_packet(stream: &mut TcpStream, packet: &[u8], timeout_duration: Duration) -> Result<()> {
    debug!("TX ({} bytes): {}", packet.len(), hex::encode(packet));
    timeout(timeout_duration, stream.write_all(packet))
        .await
        .map_err(|_| SwitcherError::DeviceTimeout("Write timeout".to_string()))?
        .map_err(|e| {
            error!("Write failed: {e}");
            SwitcherError::TcpConnectionFailed(format!("Write failed: {e}"))
        })?;
    Ok(())
}

/// Read a single response of at most `max_bytes`.
pub(crate) async fn read_response(stream: &mut TcpStream, max_bytes: usize, timeout_duration: Duration) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; max_bytes];
    let received = timeout(timeout_duration, stream.read(&mut buf))
        .await
        .map_err(|_| {
            error!("Read timeout waiting for response");
            SwitcherError::DeviceTimeout("Read timeout".to_string())
        })?
        .map_err(|e| {
            error!("Read failed: {e}");
            SwitcherError::TcpConnectionFailed(format!("Read failed: {e}"))
        })?;
    buf.truncate(received);
    debug!("RX ({} bytes): {}", buf.len(), hex::encode(&buf));
    Ok(buf)
}

/// TCP connection to a device's command port.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    ip: String,
    port: u16,
    timeout_duration: Duration,
}

impl TcpTransport {
    pub fn new(ip: &str, port: u16, timeout_secs: u64) -> Self {
        Self {
            stream: None,
            ip: ip.to_string(),
            port,
            timeout_duration: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn connect(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.ip, self.port);
        info!("TCP connecting to {} (timeout={:?})", addr, self.timeout_duration);

        let stream = timeout(self.timeout_duration, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                error!("Connection timeout to {addr}");
                SwitcherError::TcpConnectionFailed(format!("Connection timeout to {addr}"))
            })?
            .map_err(|e| {
                error!("Failed to connect to {addr}: {e}");
                SwitcherError::TcpConnectionFailed(format!("Failed to connect to {addr}: {e}"))
            })?;

        self.stream = Some(stream);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            info!("Disconnecting from {}", self.ip);
            // best effort, the device may already have closed
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Transport for TcpTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(SwitcherError::NotConnected)?;
        write_packet(stream, data, self.timeout_duration).await
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or(SwitcherError::NotConnected)?;
        read_response(stream, max_bytes, self.timeout_duration).await
    }
}
