#![allow(dead_code)]

use sne::noc::codec::NocAddress;
use sne::noc::link::NocLink;
use sne::noc::mesh::SimulatedMesh;
use sne::{Result, SneError};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
  Store { addr: u32, value: u32 },
  Load { addr: u32 },
}

/// Records every call in order, then forwards to a simulated mesh.
///
/// With `yielding`, each store yields the thread before and after being
/// recorded so that unsynchronised callers would interleave.
pub struct RecordingLink {
  pub mesh: SimulatedMesh,
  calls: Mutex<Vec<Call>>,
  yielding: bool,
}

impl RecordingLink {
  pub fn new(mesh: SimulatedMesh) -> Self {
    Self {
      mesh,
      calls: Mutex::new(Vec::new()),
      yielding: false,
    }
  }

  pub fn yielding(mesh: SimulatedMesh) -> Self {
    Self {
      yielding: true,
      ..Self::new(mesh)
    }
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn stores(&self) -> Vec<(u32, u32)> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::Store { addr, value } => Some((addr, value)),
        Call::Load { .. } => None,
      })
      .collect()
  }
}

impl NocLink for RecordingLink {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    if self.yielding {
      std::thread::yield_now();
    }
    self.calls.lock().unwrap().push(Call::Store { addr: addr.raw(), value });
    if self.yielding {
      std::thread::yield_now();
    }
    self.mesh.remote_store(value, addr)
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    self.calls.lock().unwrap().push(Call::Load { addr: addr.raw() });
    self.mesh.remote_load(addr)
  }
}

/// Accepts `ok_calls` calls, then fails every later one with a transport error
pub struct FailingLink {
  ok_calls: usize,
  attempts: AtomicUsize,
}

impl FailingLink {
  pub fn after(ok_calls: usize) -> Self {
    Self {
      ok_calls,
      attempts: AtomicUsize::new(0),
    }
  }

  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }

  fn attempt(&self) -> Result<()> {
    let n = self.attempts.fetch_add(1, Ordering::SeqCst);
    if n >= self.ok_calls {
      return Err(SneError::from(io::Error::new(io::ErrorKind::BrokenPipe, "link down")));
    }
    Ok(())
  }
}

impl NocLink for FailingLink {
  fn remote_store(&self, _value: u32, _addr: NocAddress) -> Result<()> {
    self.attempt()
  }

  fn remote_load(&self, _addr: NocAddress) -> Result<u32> {
    self.attempt().map(|_| 0)
  }
}
