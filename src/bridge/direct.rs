/// Direct memory writer - single-store path into a tile's TCDM
use super::BridgeWindows;
use crate::error::{Result, SneError};
use crate::noc::codec::TileSelector;
use crate::noc::link::NocLink;
use crate::utils::sink::{DebugSink, NullSink};
use std::sync::Arc;

/// Stages data into tile-local memory without the register bridge.
///
/// Takes no locks. Stores to the same byte address keep their program order
/// because the link delivers in order.
pub struct DirectMemoryWriter<L: ?Sized> {
  link: Arc<L>,
  windows: BridgeWindows,
  sink: Arc<dyn DebugSink>,
}

impl<L: NocLink + ?Sized> DirectMemoryWriter<L> {
  pub fn new(link: Arc<L>, windows: BridgeWindows) -> Self {
    Self {
      link,
      windows,
      sink: Arc::new(NullSink),
    }
  }

  pub fn with_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
    self.sink = sink;
    self
  }

  /// One store of `value` at `direct_mem_base + byte_address` on `tile`
  pub fn write_memory_direct(&self, tile: TileSelector, byte_address: u32, value: u32) -> Result<()> {
    let offset = self
      .windows
      .direct_mem_base
      .checked_add(byte_address)
      .ok_or(SneError::InvalidOffset {
        offset: byte_address,
        limit: u32::MAX - self.windows.direct_mem_base,
      })?;
    let addr = tile.address(offset)?;

    self.link.remote_store(value, addr)?;
    self.sink.emit(addr.raw());
    self.sink.emit(value);
    Ok(())
  }

  /// Writes `words[i % words.len()]` to byte address `i * stride` for
  /// `i in 0..count`; returns the number of stores issued.
  pub fn stage_words(&self, tile: TileSelector, words: &[u32], count: usize, stride: u32) -> Result<usize> {
    if count == 0 {
      return Ok(0);
    }
    if words.is_empty() {
      return Err(SneError::config("stage_words needs at least one word"));
    }

    for i in 0..count {
      let byte_address = u32::try_from(i)
        .ok()
        .and_then(|i| i.checked_mul(stride))
        .ok_or(SneError::InvalidOffset {
          offset: u32::MAX,
          limit: u32::MAX,
        })?;
      self.write_memory_direct(tile, byte_address, words[i % words.len()])?;
    }
    log::debug!("{}: staged {} words at stride {}", tile, count, stride);
    Ok(count)
  }
}
