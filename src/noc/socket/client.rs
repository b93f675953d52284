use super::protocol::*;
use crate::error::{Result, SneError};
use crate::noc::codec::NocAddress;
use crate::noc::link::NocLink;
use std::io::{self, ErrorKind};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// NoC link carried over TCP to a mesh bridge (RTL co-simulation or `sne serve`).
///
/// Each store is acknowledged before the next request goes out, which keeps
/// stores in program order on the wire. Request/response pairs are serialized
/// on the stream mutex.
///
/// An I/O failure or timeout in the middle of an exchange leaves the framing
/// unknown, so the stream is shut down and every later call fails.
#[derive(Debug)]
pub struct SocketLink {
  stream: Mutex<TcpStream>,
  timeout: Option<Duration>,
  broken: AtomicBool,
}

impl SocketLink {
  pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Option<Duration>) -> Result<Self> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    log::info!("Connected to mesh bridge at {}", stream.peer_addr()?);
    Ok(Self {
      stream: Mutex::new(stream),
      timeout,
      broken: AtomicBool::new(false),
    })
  }

  fn stream(&self) -> io::Result<MutexGuard<'_, TcpStream>> {
    self
      .stream
      .lock()
      .map_err(|_| io::Error::new(ErrorKind::Other, "socket link poisoned"))
  }

  fn map_err(&self, err: io::Error) -> SneError {
    match (err.kind(), self.timeout) {
      (ErrorKind::WouldBlock | ErrorKind::TimedOut, Some(timeout)) => SneError::LinkTimeout {
        duration_ms: timeout.as_millis() as u64,
      },
      _ => SneError::from(err),
    }
  }

  pub fn is_broken(&self) -> bool {
    self.broken.load(Ordering::SeqCst)
  }

  /// One request/response pair; any I/O error breaks the link for good
  fn exchange<Req: Frame, Resp: Frame>(&self, req: &Req) -> io::Result<Resp> {
    let mut stream = self.stream()?;
    if self.is_broken() {
      return Err(io::Error::new(
        ErrorKind::NotConnected,
        "socket link closed after an earlier failure",
      ));
    }

    let result = write_struct(&mut *stream, req).and_then(|_| read_struct::<Resp, _>(&mut *stream));
    if let Err(e) = &result {
      self.broken.store(true, Ordering::SeqCst);
      let _ = stream.shutdown(Shutdown::Both);
      log::error!("socket link to mesh bridge closed: {}", e);
    }
    result
  }

  fn store(&self, value: u32, addr: NocAddress) -> io::Result<()> {
    let req = StoreReq {
      header: MsgHeader::new(MsgType::StoreReq),
      addr: addr.raw(),
      value,
    };
    let resp: StoreResp = self.exchange(&req)?;
    if resp.status != STATUS_OK {
      return Err(io::Error::new(
        ErrorKind::Other,
        format!("bridge rejected store to {}", addr),
      ));
    }
    Ok(())
  }

  fn load(&self, addr: NocAddress) -> io::Result<u32> {
    let req = LoadReq {
      header: MsgHeader::new(MsgType::LoadReq),
      addr: addr.raw(),
      padding: 0,
    };
    let resp: LoadResp = self.exchange(&req)?;
    if resp.status != STATUS_OK {
      return Err(io::Error::new(
        ErrorKind::Other,
        format!("bridge rejected load from {}", addr),
      ));
    }
    Ok(resp.value)
  }
}

impl NocLink for SocketLink {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    self.store(value, addr).map_err(|e| self.map_err(e))
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    self.load(addr).map_err(|e| self.map_err(e))
  }
}
