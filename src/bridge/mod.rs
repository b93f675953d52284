pub mod direct;
pub mod lock;
pub mod register;

pub use direct::DirectMemoryWriter;
pub use lock::TileLocks;
pub use register::RegisterBridge;

use crate::error::{Result, SneError};
use crate::noc::codec::LOCAL_MASK;
use serde::{Deserialize, Serialize};

/// Tile-relative offset of the address window (latches the internal register offset)
pub const CONFIG_ADDR_OFFSET: u32 = 0x80;
/// Tile-relative offset of the data window (triggers the internal write)
pub const CONFIG_DATA_OFFSET: u32 = 0x84;
/// Tile-relative base of the direct TCDM write path
pub const DIRECT_MEM_BASE_OFFSET: u32 = 0x40;

/// Fixed bridge locations on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeWindows {
  #[serde(default = "default_config_addr")]
  pub config_addr_offset: u32,
  #[serde(default = "default_config_data")]
  pub config_data_offset: u32,
  #[serde(default = "default_direct_mem_base")]
  pub direct_mem_base: u32,
}

fn default_config_addr() -> u32 {
  CONFIG_ADDR_OFFSET
}

fn default_config_data() -> u32 {
  CONFIG_DATA_OFFSET
}

fn default_direct_mem_base() -> u32 {
  DIRECT_MEM_BASE_OFFSET
}

impl Default for BridgeWindows {
  fn default() -> Self {
    Self {
      config_addr_offset: CONFIG_ADDR_OFFSET,
      config_data_offset: CONFIG_DATA_OFFSET,
      direct_mem_base: DIRECT_MEM_BASE_OFFSET,
    }
  }
}

impl BridgeWindows {
  /// The two windows must be distinct tile-local locations
  pub fn validate(&self) -> Result<()> {
    for offset in [self.config_addr_offset, self.config_data_offset, self.direct_mem_base] {
      if offset > LOCAL_MASK {
        return Err(SneError::InvalidOffset {
          offset,
          limit: LOCAL_MASK,
        });
      }
    }
    if self.config_addr_offset == self.config_data_offset {
      return Err(SneError::config(format!(
        "address and data windows share offset {:#x}",
        self.config_addr_offset
      )));
    }
    Ok(())
  }
}
