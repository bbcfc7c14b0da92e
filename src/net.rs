//! Inbound call listeners. The core never negotiates TELNET/SSH on the
//! accepting side — an inbound call is just a byte stream handed to the
//! ringer, same as an outbound dial's `Connection` once the handshake (if
//! any) completes. Each configured inbound socket gets its own listener
//! task; every accepted stream spawns its own ringer.

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::InboundConfig;
use crate::modem::{ringer, DteSink, Shared};
use crate::transport::Connection;
use async_trait::async_trait;

/// A raw, unauthenticated TCP stream wearing the `Connection` interface.
/// Inbound callers are trusted to speak the declared protocol themselves;
/// the core only needs bytes in, bytes out.
struct InboundConnection {
    stream: TcpStream,
    remote: String,
}

#[async_trait]
impl Connection for InboundConnection {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.stream.read(buf).await
    }

    async fn close(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await
    }

    fn remote_addr(&self) -> &str {
        &self.remote
    }
}

/// Listen on `cfg.listen` forever, spawning one ringer task per accepted
/// connection. Runs until the listener itself fails to bind or accept.
pub async fn listen(cfg: InboundConfig, modem: Shared, dte: DteSink) -> io::Result<()> {
    let listener = TcpListener::bind(&cfg.listen).await?;
    info!(addr = %cfg.listen, protocol = %cfg.protocol, "inbound listener started");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        let conn = InboundConnection {
            stream,
            remote: peer.to_string(),
        };
        handle_call(modem.clone(), dte.clone(), Box::new(conn), peer).await;
    }
}

async fn handle_call(modem: Shared, dte: DteSink, conn: Box<dyn Connection>, peer: SocketAddr) {
    let busy = modem.lock().await.signals.check_busy();
    if busy {
        warn!(%peer, "rejecting inbound call, line busy");
        return;
    }
    info!(%peer, "inbound call accepted, ringing");
    tokio::spawn(ringer::ring(modem, dte, conn));
}
