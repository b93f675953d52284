/// Transport trace - records every link call as one JSON line
use super::codec::{AddressEncoding, NocAddress};
use super::link::NocLink;
use crate::error::Result;
use std::io::{self, Write};
use std::sync::Mutex;

struct TraceState<W> {
  writer: W,
  seq: u64,
}

/// Forwards to an inner link and appends a trace entry per call
pub struct TraceLink<L, W> {
  inner: L,
  encoding: AddressEncoding,
  state: Mutex<TraceState<W>>,
}

impl<L: NocLink, W: Write + Send> TraceLink<L, W> {
  pub fn new(inner: L, encoding: AddressEncoding, writer: W) -> Self {
    Self {
      inner,
      encoding,
      state: Mutex::new(TraceState { writer, seq: 0 }),
    }
  }

  pub fn inner(&self) -> &L {
    &self.inner
  }

  fn record(&self, op: &str, addr: NocAddress, value: Option<u32>, ok: bool) -> io::Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|_| io::Error::new(io::ErrorKind::Other, "trace writer poisoned"))?;
    let (tile, offset) = self.encoding.decode(addr);
    let trace_entry = serde_json::json!({
      "seq": state.seq,
      "op": op,
      "address": format!("{:#010x}", addr.raw()),
      "tile": tile,
      "offset": format!("{:#x}", offset),
      "value": value.map(|v| format!("{:#010x}", v)),
      "ok": ok,
    });
    state.seq += 1;
    writeln!(state.writer, "{}", trace_entry)?;
    state.writer.flush()
  }

  fn record_or_warn(&self, op: &str, addr: NocAddress, value: Option<u32>, ok: bool) {
    if let Err(e) = self.record(op, addr, value, ok) {
      log::warn!("trace write failed for {} at {}: {}", op, addr, e);
    }
  }
}

impl<L: NocLink, W: Write + Send> NocLink for TraceLink<L, W> {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    let result = self.inner.remote_store(value, addr);
    self.record_or_warn("store", addr, Some(value), result.is_ok());
    result
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    let result = self.inner.remote_load(addr);
    let value = result.as_ref().ok().copied();
    self.record_or_warn("load", addr, value, result.is_ok());
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bridge::BridgeWindows;
  use crate::noc::codec::{tile_address, TileId};
  use crate::error::SneError;
  use crate::noc::mesh::SimulatedMesh;

  struct BrokenWriter;

  impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
      Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
      Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
  }

  struct DeadLink;

  impl NocLink for DeadLink {
    fn remote_store(&self, _value: u32, _addr: NocAddress) -> Result<()> {
      Err(SneError::LinkTimeout { duration_ms: 7 })
    }

    fn remote_load(&self, _addr: NocAddress) -> Result<u32> {
      Err(SneError::LinkTimeout { duration_ms: 7 })
    }
  }

  #[test]
  fn one_json_line_per_call() {
    let mesh = SimulatedMesh::new(AddressEncoding::Linear, BridgeWindows::default());
    let link = TraceLink::new(mesh, AddressEncoding::Linear, Vec::new());
    let addr = tile_address(TileId(9), 0x48).unwrap();

    link.remote_store(0x1234_5678, addr).unwrap();
    assert_eq!(link.remote_load(addr).unwrap(), 0x1234_5678);

    let state = link.state.lock().unwrap();
    let text = String::from_utf8(state.writer.clone()).unwrap();
    let lines: Vec<serde_json::Value> = text
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["op"], "store");
    assert_eq!(lines[0]["address"], "0x00009048");
    assert_eq!(lines[0]["tile"], 9);
    assert_eq!(lines[1]["op"], "load");
    assert_eq!(lines[1]["value"], "0x12345678");
    assert_eq!(lines[1]["seq"], 1);
  }

  #[test]
  fn trace_failure_keeps_the_landed_store() {
    let mesh = SimulatedMesh::new(AddressEncoding::Linear, BridgeWindows::default());
    let link = TraceLink::new(mesh, AddressEncoding::Linear, BrokenWriter);
    let addr = tile_address(TileId(9), 0x48).unwrap();

    link.remote_store(0x55, addr).unwrap();
    assert_eq!(link.inner().word(addr), Some(0x55));
    assert_eq!(link.remote_load(addr).unwrap(), 0x55);
  }

  #[test]
  fn transport_error_passes_through_a_broken_trace() {
    let link = TraceLink::new(DeadLink, AddressEncoding::Linear, BrokenWriter);
    let addr = tile_address(TileId(9), 0).unwrap();

    assert!(matches!(
      link.remote_store(1, addr),
      Err(SneError::LinkTimeout { duration_ms: 7 })
    ));
    assert!(matches!(
      link.remote_load(addr),
      Err(SneError::LinkTimeout { duration_ms: 7 })
    ));
  }
}
