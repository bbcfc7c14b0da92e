//! The DTE surface the byte pump and the rest of the control plane talk to:
//! a `ReadByte` channel and a synchronized `WriteByte`/`Println`/`Flush`
//! sink, split apart so the pump can block on the next incoming byte while
//! the ringer and dispatcher still write to the DTE concurrently.
//!
//! Concrete implementations are ambient collaborators — a real serial port
//! (raw termios, grounded on the teacher's modem I/O thread) and a TCP
//! socket stand-in for hardware-less testing.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::time::Duration;

use async_trait::async_trait;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::sys::termios::{self, BaudRate, SetArg};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::warn;

#[async_trait]
pub trait DteReader: Send {
    async fn read_byte(&mut self) -> std::io::Result<u8>;
}

#[async_trait]
pub trait DteWriter: Send {
    async fn write_bytes(&mut self, data: &[u8]) -> std::io::Result<()>;
    async fn flush(&mut self) -> std::io::Result<()>;

    async fn println(&mut self, line: &str) -> std::io::Result<()> {
        self.write_bytes(line.as_bytes()).await?;
        self.write_bytes(b"\r\n").await
    }
}

pub trait Dte {
    fn split(self: Box<Self>) -> (Box<dyn DteReader>, Box<dyn DteWriter>);
}

/// A real serial port, opened in raw mode the way the teacher's `modem.rs`
/// opens its AT-command device, with blocking reads moved to a dedicated
/// OS thread so the tokio runtime never stalls on them.
pub struct SerialDte {
    fd: OwnedFd,
    rx: mpsc::Receiver<u8>,
}

impl SerialDte {
    pub fn open(device: &str) -> std::io::Result<Self> {
        let fd = open(device, OFlag::O_RDWR | OFlag::O_NOCTTY, Mode::empty())
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

        let mut tio =
            termios::tcgetattr(&fd).map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
        termios::cfmakeraw(&mut tio);
        let _ = termios::cfsetspeed(&mut tio, BaudRate::B115200);
        tio.control_flags
            .insert(termios::ControlFlags::CLOCAL | termios::ControlFlags::CREAD);
        tio.control_flags.remove(termios::ControlFlags::CRTSCTS);
        tio.control_chars[libc::VMIN] = 0;
        tio.control_chars[libc::VTIME] = 1;
        termios::tcsetattr(&fd, SetArg::TCSANOW, &tio)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

        let (tx, rx) = mpsc::channel(256);
        let reader_fd = fd.as_raw_fd();
        std::thread::Builder::new()
            .name("dte-serial-reader".into())
            .spawn(move || serial_reader_thread(reader_fd, &tx))
            .map_err(std::io::Error::other)?;

        Ok(Self { fd, rx })
    }
}

fn serial_reader_thread(fd: RawFd, tx: &mpsc::Sender<u8>) {
    let mut buf = [0u8; 1];
    loop {
        match nix::unistd::read(fd, &mut buf) {
            Ok(0) => std::thread::sleep(Duration::from_millis(20)),
            Ok(_) => {
                if tx.blocking_send(buf[0]).is_err() {
                    break;
                }
            }
            Err(nix::errno::Errno::EAGAIN) => std::thread::sleep(Duration::from_millis(20)),
            Err(e) => {
                warn!(error = %e, "serial read failed, stopping reader thread");
                break;
            }
        }
    }
}

struct SerialReader {
    rx: mpsc::Receiver<u8>,
}

#[async_trait]
impl DteReader for SerialReader {
    async fn read_byte(&mut self) -> std::io::Result<u8> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| std::io::Error::other("serial reader thread stopped"))
    }
}

struct SerialWriter {
    fd: OwnedFd,
}

#[async_trait]
impl DteWriter for SerialWriter {
    async fn write_bytes(&mut self, data: &[u8]) -> std::io::Result<()> {
        nix::unistd::write(&self.fd, data).map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        termios::tcdrain(&self.fd).map_err(|e| std::io::Error::from_raw_os_error(e as i32))
    }
}

impl Dte for SerialDte {
    fn split(self: Box<Self>) -> (Box<dyn DteReader>, Box<dyn DteWriter>) {
        (Box::new(SerialReader { rx: self.rx }), Box::new(SerialWriter { fd: self.fd }))
    }
}

/// A TCP socket standing in for the terminal when no serial hardware is
/// present — one accepted connection plays the role of the DTE.
pub struct TcpDte {
    stream: TcpStream,
}

impl TcpDte {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Dte for TcpDte {
    fn split(self: Box<Self>) -> (Box<dyn DteReader>, Box<dyn DteWriter>) {
        let (read_half, write_half) = self.stream.into_split();
        (Box::new(TcpReader { read_half }), Box::new(TcpWriter { write_half }))
    }
}

struct TcpReader {
    read_half: OwnedReadHalf,
}

#[async_trait]
impl DteReader for TcpReader {
    async fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut buf = [0u8; 1];
        let n = self.read_half.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "dte closed"));
        }
        Ok(buf[0])
    }
}

struct TcpWriter {
    write_half: OwnedWriteHalf,
}

#[async_trait]
impl DteWriter for TcpWriter {
    async fn write_bytes(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.write_half.write_all(data).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.write_half.flush().await
    }
}
