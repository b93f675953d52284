/// In-process model of a MoSAIC mesh whose tiles carry the register bridge
use super::codec::{AddressEncoding, NocAddress};
use super::link::NocLink;
use crate::bridge::BridgeWindows;
use crate::error::Result;
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

/// Bridge state of one tile
#[derive(Debug, Default, Clone)]
struct TileState {
  /// Internal register offset latched by the address window
  latched: u32,
  /// Internal register file written through the data window
  registers: HashMap<u32, u32>,
}

#[derive(Debug, Default)]
struct MeshState {
  tiles: HashMap<u32, TileState>,
  /// Everything outside the bridge windows, keyed by raw NoC address
  words: HashMap<u32, u32>,
  stores: u64,
  loads: u64,
}

/// Simulated mesh.
///
/// A store to a tile's address window latches the internal offset, a store to
/// its data window writes the internal register file at the latched offset.
/// Every other store lands in a flat word store. Loads see the register file
/// first, then the flat store, then zero.
#[derive(Debug)]
pub struct SimulatedMesh {
  encoding: AddressEncoding,
  windows: BridgeWindows,
  state: Mutex<MeshState>,
}

impl SimulatedMesh {
  pub fn new(encoding: AddressEncoding, windows: BridgeWindows) -> Self {
    Self {
      encoding,
      windows,
      state: Mutex::new(MeshState::default()),
    }
  }

  fn state(&self) -> io::Result<MutexGuard<'_, MeshState>> {
    self
      .state
      .lock()
      .map_err(|_| io::Error::new(io::ErrorKind::Other, "simulated mesh state poisoned"))
  }

  /// Internal register of a tile, as written through the bridge
  pub fn register(&self, tile_key: u32, offset: u32) -> Option<u32> {
    let state = self.state().ok()?;
    state.tiles.get(&tile_key)?.registers.get(&offset).copied()
  }

  /// Word stored at a raw NoC address outside the bridge windows
  pub fn word(&self, addr: NocAddress) -> Option<u32> {
    self.state().ok()?.words.get(&addr.raw()).copied()
  }

  /// Preloads a tile register, as if reset values were present
  pub fn init_register(&self, tile_key: u32, offset: u32, value: u32) -> Result<()> {
    let mut state = self.state()?;
    state.tiles.entry(tile_key).or_default().registers.insert(offset, value);
    Ok(())
  }

  pub fn store_count(&self) -> u64 {
    self.state().map(|s| s.stores).unwrap_or(0)
  }

  pub fn load_count(&self) -> u64 {
    self.state().map(|s| s.loads).unwrap_or(0)
  }

  pub fn reset(&self) -> Result<()> {
    *self.state()? = MeshState::default();
    Ok(())
  }
}

impl NocLink for SimulatedMesh {
  fn remote_store(&self, value: u32, addr: NocAddress) -> Result<()> {
    let (tile_key, offset) = self.encoding.decode(addr);
    let mut state = self.state()?;
    state.stores += 1;

    if offset == self.windows.config_addr_offset {
      state.tiles.entry(tile_key).or_default().latched = value;
    } else if offset == self.windows.config_data_offset {
      let tile = state.tiles.entry(tile_key).or_default();
      let target = tile.latched;
      tile.registers.insert(target, value);
      log::trace!("mesh: tile {} reg[{:#x}] <= {:#010x}", tile_key, target, value);
    } else {
      state.words.insert(addr.raw(), value);
    }
    Ok(())
  }

  fn remote_load(&self, addr: NocAddress) -> Result<u32> {
    let (tile_key, offset) = self.encoding.decode(addr);
    let mut state = self.state()?;
    state.loads += 1;

    let value = state
      .tiles
      .get(&tile_key)
      .and_then(|tile| tile.registers.get(&offset).copied())
      .or_else(|| state.words.get(&addr.raw()).copied())
      .unwrap_or(0);
    Ok(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::noc::codec::{tile_address, TileId};

  fn mesh() -> SimulatedMesh {
    SimulatedMesh::new(AddressEncoding::Linear, BridgeWindows::default())
  }

  #[test]
  fn data_window_writes_latched_register() {
    let mesh = mesh();
    mesh.remote_store(0x20, tile_address(TileId(9), 0x80).unwrap()).unwrap();
    mesh.remote_store(0x1000_0000, tile_address(TileId(9), 0x84).unwrap()).unwrap();

    assert_eq!(mesh.register(9, 0x20), Some(0x1000_0000));
    assert_eq!(mesh.register(8, 0x20), None);
    assert_eq!(mesh.remote_load(tile_address(TileId(9), 0x20).unwrap()).unwrap(), 0x1000_0000);
  }

  #[test]
  fn plain_stores_land_in_word_store() {
    let mesh = mesh();
    let addr = tile_address(TileId(1), 0x10).unwrap();
    mesh.remote_store(0xCAFE_CAF1, addr).unwrap();

    assert_eq!(mesh.word(addr), Some(0xCAFE_CAF1));
    assert_eq!(mesh.remote_load(addr).unwrap(), 0xCAFE_CAF1);
    assert_eq!(mesh.remote_load(tile_address(TileId(1), 0x14).unwrap()).unwrap(), 0);
    assert_eq!(mesh.store_count(), 1);
    assert_eq!(mesh.load_count(), 2);
  }

  #[test]
  fn reset_clears_everything() {
    let mesh = mesh();
    mesh.init_register(9, 0, 7).unwrap();
    mesh.reset().unwrap();
    assert_eq!(mesh.register(9, 0), None);
  }
}
