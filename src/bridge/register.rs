/// Register bridge protocol - two-phase indirect register writes
use super::lock::{acquire, TileLocks};
use super::BridgeWindows;
use crate::error::Result;
use crate::noc::codec::TileSelector;
use crate::noc::link::NocLink;
use crate::utils::sink::{DebugSink, NullSink};
use std::sync::Arc;

/// Drives the address-window / data-window sequence on remote tiles
pub struct RegisterBridge<L: ?Sized> {
  link: Arc<L>,
  windows: BridgeWindows,
  sink: Arc<dyn DebugSink>,
  locks: Arc<TileLocks>,
}

impl<L: NocLink + ?Sized> RegisterBridge<L> {
  /// Joins the tile locks of every other bridge over the same `link`
  pub fn new(link: Arc<L>, windows: BridgeWindows) -> Self {
    let locks = TileLocks::for_link(&link);
    Self {
      link,
      windows,
      sink: Arc::new(NullSink),
      locks,
    }
  }

  /// Serializes on `locks` instead; needed when two different link objects
  /// reach the same tiles.
  pub fn with_locks(mut self, locks: Arc<TileLocks>) -> Self {
    self.locks = locks;
    self
  }

  pub fn locks(&self) -> &Arc<TileLocks> {
    &self.locks
  }

  pub fn with_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
    self.sink = sink;
    self
  }

  pub fn link(&self) -> &Arc<L> {
    &self.link
  }

  pub fn windows(&self) -> BridgeWindows {
    self.windows
  }

  /// Writes `value` to the tile's internal register `internal_offset`.
  ///
  /// 1. store `internal_offset` to the address window (latches the target)
  /// 2. store `value` to the data window (triggers the internal transaction)
  ///
  /// Both addresses are resolved before anything is sent. The pair is issued
  /// under the tile's lock; writes to other tiles are not blocked. If the
  /// first store fails the second is never issued. There is no
  /// acknowledgment: read back to confirm.
  pub fn write_register(&self, tile: TileSelector, internal_offset: u32, value: u32) -> Result<()> {
    let addr_window = tile.address(self.windows.config_addr_offset)?;
    let data_window = tile.address(self.windows.config_data_offset)?;

    let lock = self.locks.lock_for(tile);
    let _guard = acquire(&lock);

    self.link.remote_store(internal_offset, addr_window)?;
    self.sink.emit(internal_offset);
    self.sink.emit(value);

    self.link.remote_store(value, data_window)?;
    self.sink.emit(data_window.raw());
    self.sink.emit(value);

    log::debug!("{}: reg[{:#06x}] <= {:#010x}", tile, internal_offset, value);
    Ok(())
  }

  /// Reads the word at tile-relative `offset`; reads bypass the bridge windows
  pub fn read_register(&self, tile: TileSelector, offset: u32) -> Result<u32> {
    let addr = tile.address(offset)?;
    let value = self.link.remote_load(addr)?;
    log::debug!("{}: reg[{:#06x}] => {:#010x}", tile, offset, value);
    Ok(value)
  }
}
