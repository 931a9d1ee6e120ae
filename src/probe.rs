use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Answers "is anything listening on this port?". An unreachable target is
/// `false`, never an error.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, port: u16) -> bool;
}

/// TCP connect check against the local host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: IpAddr,
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), PROBE_TIMEOUT)
    }
}

impl TcpProbe {
    pub fn new(host: IpAddr, timeout: Duration) -> Self {
        Self { host, timeout }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn probe(&self, port: u16) -> bool {
        let addr = SocketAddr::new(self.host, port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Port {} refused: {}", port, e);
                false
            }
            Err(_) => {
                debug!("Port {} timed out after {:?}", port, self.timeout);
                false
            }
        }
    }
}
