use super::protocol::*;
use crate::noc::codec::NocAddress;
use crate::noc::link::NocLink;
use std::io::{Error, ErrorKind, Result};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

/// Serves any `NocLink` over the socket protocol
pub struct SocketServer<L: ?Sized> {
  listener: TcpListener,
  link: Arc<L>,
}

impl<L: NocLink + ?Sized> SocketServer<L> {
  pub fn bind(addr: &str, link: Arc<L>) -> Result<Self> {
    let listener = TcpListener::bind(addr)?;
    log::info!("Socket server listening on {}", listener.local_addr()?);
    Ok(Self { listener, link })
  }

  pub fn local_addr(&self) -> Result<SocketAddr> {
    self.listener.local_addr()
  }

  /// Serves a single client until it disconnects
  pub fn accept_and_serve(&self) -> Result<()> {
    let (stream, addr) = self.listener.accept()?;
    log::info!("Connected: {}", addr);

    match self.serve_client(stream) {
      Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
        log::info!("Client {} disconnected", addr);
        Ok(())
      },
      other => other,
    }
  }

  /// Serves clients one after another, forever
  pub fn serve(&self) -> Result<()> {
    loop {
      if let Err(e) = self.accept_and_serve() {
        log::error!("Error serving client: {}", e);
      }
    }
  }

  fn serve_client(&self, mut stream: TcpStream) -> Result<()> {
    loop {
      let words = read_frame(&mut stream)?;

      match MsgType::from_u32(words[0]) {
        Some(MsgType::StoreReq) => {
          let req = StoreReq::from_words(words);
          let status = match self.link.remote_store(req.value, NocAddress(req.addr)) {
            Ok(()) => STATUS_OK,
            Err(e) => {
              log::warn!("store to {:#010x} failed: {}", req.addr, e);
              STATUS_ERROR
            },
          };
          let resp = StoreResp {
            header: MsgHeader::new(MsgType::StoreResp),
            status,
            reserved: 0,
          };
          write_struct(&mut stream, &resp)?;
        },
        Some(MsgType::LoadReq) => {
          let req = LoadReq::from_words(words);
          let (value, status) = match self.link.remote_load(NocAddress(req.addr)) {
            Ok(value) => (value, STATUS_OK),
            Err(e) => {
              log::warn!("load from {:#010x} failed: {}", req.addr, e);
              (0, STATUS_ERROR)
            },
          };
          let resp = LoadResp {
            header: MsgHeader::new(MsgType::LoadResp),
            value,
            status,
          };
          write_struct(&mut stream, &resp)?;
        },
        _ => {
          return Err(Error::new(
            ErrorKind::InvalidData,
            format!("Invalid message type {}", words[0]),
          ));
        },
      }
    }
  }
}
