//! Minimal SSH dialer, built the way the teacher crate drives a blocking
//! I/O device: a dedicated OS thread owns the blocking `ssh2` session, and
//! channels move bytes across the sync/async boundary (the same shape as
//! the teacher's serial-port I/O thread).

use std::io::{Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::warn;

use super::Connection;

pub struct SshConnection {
    to_remote: std_mpsc::Sender<Vec<u8>>,
    from_remote: tokio_mpsc::UnboundedReceiver<std::io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    remote: String,
}

impl SshConnection {
    pub async fn connect(host: &str, username: &str, password: &str) -> std::io::Result<Self> {
        let host = host.to_string();
        let username = username.to_string();
        let password = password.to_string();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<std::io::Result<()>>();
        let (to_remote, to_remote_rx) = std_mpsc::channel::<Vec<u8>>();
        let (from_remote_tx, from_remote) = tokio_mpsc::unbounded_channel();
        let remote = host.clone();

        std::thread::Builder::new()
            .name("ssh-session".into())
            .spawn(move || ssh_thread(&host, &username, &password, ready_tx, to_remote_rx, from_remote_tx))
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        ready_rx
            .await
            .map_err(|_| std::io::Error::other("ssh session thread dropped"))??;

        Ok(Self {
            to_remote,
            from_remote,
            pending: Vec::new(),
            remote,
        })
    }
}

fn ssh_thread(
    host: &str,
    username: &str,
    password: &str,
    ready_tx: tokio::sync::oneshot::Sender<std::io::Result<()>>,
    to_remote_rx: std_mpsc::Receiver<Vec<u8>>,
    from_remote_tx: tokio_mpsc::UnboundedSender<std::io::Result<Vec<u8>>>,
) {
    let connect_host = if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:22")
    };

    let tcp = match StdTcpStream::connect(&connect_host) {
        Ok(t) => t,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = tcp.set_nodelay(true);

    let mut session = match ssh2::Session::new() {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(std::io::Error::other(e.to_string())));
            return;
        }
    };
    session.set_tcp_stream(tcp);
    if let Err(e) = session.handshake() {
        let _ = ready_tx.send(Err(std::io::Error::other(e.to_string())));
        return;
    }
    if let Err(e) = session.userauth_password(username, password) {
        let _ = ready_tx.send(Err(std::io::Error::other(e.to_string())));
        return;
    }

    let mut channel = match session.channel_session() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(std::io::Error::other(e.to_string())));
            return;
        }
    };
    if let Err(e) = channel.shell() {
        let _ = ready_tx.send(Err(std::io::Error::other(e.to_string())));
        return;
    }
    session.set_blocking(false);
    let _ = ready_tx.send(Ok(()));

    let mut buf = [0u8; 4096];
    loop {
        match channel.read(&mut buf) {
            Ok(0) => {
                let _ = from_remote_tx.send(Ok(Vec::new()));
                break;
            }
            Ok(n) => {
                if from_remote_tx.send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                let _ = from_remote_tx.send(Err(e));
                break;
            }
        }

        match to_remote_rx.try_recv() {
            Ok(data) => {
                if let Err(e) = channel.write_all(&data) {
                    warn!(error = %e, "ssh write failed");
                    break;
                }
            }
            Err(std_mpsc::TryRecvError::Empty) => {}
            Err(std_mpsc::TryRecvError::Disconnected) => break,
        }

        std::thread::sleep(Duration::from_millis(10));
    }
    let _ = channel.close();
}

#[async_trait]
impl Connection for SshConnection {
    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.to_remote
            .send(data.to_vec())
            .map_err(|_| std::io::Error::other("ssh session thread gone"))
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            match self.from_remote.recv().await {
                Some(Ok(data)) => self.pending = data,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    async fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn remote_addr(&self) -> &str {
        &self.remote
    }
}
