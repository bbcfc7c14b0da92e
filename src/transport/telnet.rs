//! Minimal TELNET dialer. The core only needs a byte pipe; this does not
//! negotiate TELNET options (ECHO, SGA, …) — it opens a plain TCP socket and
//! passes bytes through, which is how most "raw mode" TELNET peers are used
//! against line-oriented services in practice.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::Connection;
use async_trait::async_trait;

pub struct TelnetConnection {
    stream: TcpStream,
    remote: String,
}

impl TelnetConnection {
    pub async fn connect(host: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(host).await?;
        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| host.to_string());
        Ok(Self { stream, remote })
    }
}

#[async_trait]
impl Connection for TelnetConnection {
    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    fn remote_addr(&self) -> &str {
        &self.remote
    }
}
