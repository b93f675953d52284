/// Remote memory link - the only I/O primitives the bridge protocol is built on
use super::codec::NocAddress;
use crate::error::Result;
use std::sync::Arc;

/// Store/load access to the flat NoC address space.
///
/// Stores issued through one link are delivered in program order. A store
/// returning `Ok` means the link accepted it, not that the target tile acted
/// on it; `remote_load` blocks until the word arrives or the link gives up.
pub trait NocLink: Send + Sync {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()>;

  fn remote_load(&self, addr: NocAddress) -> Result<u32>;
}

impl<L: NocLink + ?Sized> NocLink for Arc<L> {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    (**self).remote_store(value, addr)
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    (**self).remote_load(addr)
  }
}

impl<L: NocLink + ?Sized> NocLink for Box<L> {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    (**self).remote_store(value, addr)
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    (**self).remote_load(addr)
  }
}
