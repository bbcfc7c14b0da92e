//! The `Connection` capability the core dials and bridges against. Concrete
//! dialers ([`telnet`], [`ssh`]) are ambient collaborators — the modem core
//! only ever holds a `Box<dyn Connection>`.

pub mod ssh;
pub mod telnet;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Telnet,
    Ssh,
}

/// One outbound (or, in principle, inbound) byte-stream connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write bytes to the remote peer.
    async fn write(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Read whatever is available; `Ok(0)` means the peer closed cleanly.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    async fn close(&mut self) -> std::io::Result<()>;

    fn remote_addr(&self) -> &str;
}

/// Dial `host` over `protocol`, with the credentials from a phonebook entry
/// when applicable (SSH; TELNET ignores them).
pub async fn dial(
    protocol: Protocol,
    host: &str,
    username: &str,
    password: &str,
    timeout: std::time::Duration,
) -> std::io::Result<Box<dyn Connection>> {
    match protocol {
        Protocol::Telnet => {
            let conn = tokio::time::timeout(timeout, telnet::TelnetConnection::connect(host))
                .await
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timed out"))??;
            Ok(Box::new(conn))
        }
        Protocol::Ssh => {
            let conn = tokio::time::timeout(
                timeout,
                ssh::SshConnection::connect(host, username, password),
            )
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timed out"))??;
            Ok(Box::new(conn))
        }
    }
}
