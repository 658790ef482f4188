//! UDP listener forwarding device broadcasts.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::broadcast::{BroadcastMessage, is_switcher_originator, parse_broadcast};
use super::types::{ProtocolVersion, READ_SIZE};
use crate::error::{Result, SwitcherError};

const RECV_BACKOFF_BASE: Duration = Duration::from_millis(100);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Listens on one or more UDP ports for device status broadcasts.
pub struct SwitcherBridge {
    bind_ip: IpAddr,
    ports: Vec<u16>,
    version: ProtocolVersion,
}

/// Running listeners; dropping the handle leaves them running.
pub struct BridgeHandle {
    tasks: Vec<JoinHandle<()>>,
    local_addrs: Vec<SocketAddr>,
}

impl SwitcherBridge {
    pub fn new(ports: Vec<u16>, version: ProtocolVersion) -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ports,
            version,
        }
    }

    /// Listen on a specific address instead of all interfaces.
    pub fn with_bind_ip(mut self, bind_ip: IpAddr) -> Self {
        self.bind_ip = bind_ip;
        self
    }

    /// Bind every port and forward parsed broadcasts into `sender`.
    pub async fn start(&self, sender: mpsc::Sender<BroadcastMessage>) -> Result<BridgeHandle> {
        let mut tasks = Vec::with_capacity(self.ports.len());
        let mut local_addrs = Vec::with_capacity(self.ports.len());

        for &port in &self.ports {
            let addr = SocketAddr::new(self.bind_ip, port);
            let socket = match UdpSocket::bind(addr).await {
                Ok(socket) => socket,
                Err(e) => {
                    error!("Failed to bind {addr}: {e}");
                    tasks.iter().for_each(JoinHandle::abort);
                    return Err(SwitcherError::Io(e));
                }
            };
            let local = socket.local_addr()?;
            info!("Listening for broadcasts on {local}");
            local_addrs.push(local);
            tasks.push(tokio::spawn(listen(socket, self.version, sender.clone())));
        }

        Ok(BridgeHandle { tasks, local_addrs })
    }
}

async fn listen(socket: UdpSocket, version: ProtocolVersion, sender: mpsc::Sender<BroadcastMessage>) {
    let mut buf = vec![0u8; READ_SIZE];
    let mut failures = 0u32;
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => {
                failures = 0;
                received
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = recv_backoff(failures);
                error!("Broadcast receive failed ({failures} in a row), retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        let datagram = &buf[..len];

        if !is_switcher_originator(datagram) {
            debug!("Received datagram from an unknown source {peer}");
            continue;
        }

        match parse_broadcast(datagram, version) {
            Ok(message) => {
                if sender.send(message).await.is_err() {
                    debug!("Broadcast receiver dropped, stopping listener");
                    return;
                }
            }
            Err(e) => warn!("Unverifiable broadcast from {peer}: {e}"),
        }
    }
}

/// Delay after `failures` consecutive receive errors, doubling up to a cap.
fn recv_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    RECV_BACKOFF_BASE
        .saturating_mul(1 << exponent)
        .min(RECV_BACKOFF_MAX)
}

impl BridgeHandle {
    /// Bound addresses, in the order the ports were given.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    pub fn stop(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("Bridge stopped");
    }
}
