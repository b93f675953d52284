/// NoC address codec - maps (tile, offset) pairs onto the flat MoSAIC address space
use crate::error::{Result, SneError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile id position in a linear NoC address
pub const TILE_SHIFT: u32 = 12;
/// Tile-local offset bits of a linear NoC address
pub const LOCAL_MASK: u32 = 0xFFF;
/// Largest tile id that survives the shift
pub const MAX_TILE: u32 = u32::MAX >> TILE_SHIFT;

/// Offset position in a packed-coordinate address
pub const COORD_SHIFT: u32 = 6;
/// Mesh coordinates are 3 bits wide
pub const COORD_MAX: u32 = 0x7;
/// Largest offset that survives the coordinate shift
pub const COORD_OFFSET_LIMIT: u32 = u32::MAX >> COORD_SHIFT;

/// Linear tile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

/// Flat address understood by the NoC transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NocAddress(pub u32);

impl NocAddress {
  pub fn raw(self) -> u32 {
    self.0
  }

  /// Tile id bits of a linearly encoded address
  pub fn tile(self) -> TileId {
    TileId(self.0 >> TILE_SHIFT)
  }

  /// Tile-local bits of a linearly encoded address
  pub fn local_offset(self) -> u32 {
    self.0 & LOCAL_MASK
  }
}

impl fmt::Display for NocAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:#010x}", self.0)
  }
}

impl fmt::Display for TileId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "tile {}", self.0)
  }
}

/// Linear encoding: `(tile << 12) | offset`.
///
/// Offsets wider than [`LOCAL_MASK`] are rejected; masking them would silently
/// select a different tile.
pub fn tile_address(tile: TileId, offset: u32) -> Result<NocAddress> {
  if tile.0 > MAX_TILE {
    return Err(SneError::InvalidTile {
      tile: tile.0,
      limit: MAX_TILE,
    });
  }
  if offset > LOCAL_MASK {
    return Err(SneError::InvalidOffset {
      offset,
      limit: LOCAL_MASK,
    });
  }
  Ok(NocAddress((tile.0 << TILE_SHIFT) | offset))
}

/// Packed-coordinate encoding: `(offset << 6) | (y << 3) | x`.
pub fn coordinate_address(x: u32, y: u32, offset: u32) -> Result<NocAddress> {
  if x > COORD_MAX || y > COORD_MAX {
    return Err(SneError::InvalidCoordinate { x, y });
  }
  if offset > COORD_OFFSET_LIMIT {
    return Err(SneError::InvalidOffset {
      offset,
      limit: COORD_OFFSET_LIMIT,
    });
  }
  Ok(NocAddress((offset << COORD_SHIFT) | (y << 3) | x))
}

/// Splits a packed-coordinate address back into `(x, y, offset)`
pub fn decode_coordinate(addr: NocAddress) -> (u32, u32, u32) {
  let raw = addr.raw();
  (raw & COORD_MAX, (raw >> 3) & COORD_MAX, raw >> COORD_SHIFT)
}

/// Address encoding a session commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressEncoding {
  Linear,
  Coordinate,
}

impl AddressEncoding {
  /// Splits an address into `(tile key, local offset)`.
  ///
  /// The tile key is the linear tile id, or `(y << 3) | x` for packed
  /// coordinates.
  pub fn decode(self, addr: NocAddress) -> (u32, u32) {
    match self {
      Self::Linear => (addr.tile().0, addr.local_offset()),
      Self::Coordinate => {
        let (x, y, offset) = decode_coordinate(addr);
        ((y << 3) | x, offset)
      },
    }
  }
}

/// Which tile a session talks to, and with which encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileSelector {
  Linear(TileId),
  Coordinate { x: u32, y: u32 },
}

impl TileSelector {
  pub fn linear(tile: u32) -> Self {
    Self::Linear(TileId(tile))
  }

  pub fn coordinate(x: u32, y: u32) -> Self {
    Self::Coordinate { x, y }
  }

  /// Resolves a tile-relative offset with this selector's encoding
  pub fn address(self, offset: u32) -> Result<NocAddress> {
    match self {
      Self::Linear(tile) => tile_address(tile, offset),
      Self::Coordinate { x, y } => coordinate_address(x, y, offset),
    }
  }

  pub fn encoding(self) -> AddressEncoding {
    match self {
      Self::Linear(_) => AddressEncoding::Linear,
      Self::Coordinate { .. } => AddressEncoding::Coordinate,
    }
  }

  /// Rejects selectors that cannot encode any address
  pub fn validate(self) -> Result<()> {
    self.address(0).map(|_| ())
  }

  /// Bits mixed into debug markers, `tile << 8` as the bring-up markers do
  pub fn marker_tag(self) -> u32 {
    let id = match self {
      Self::Linear(tile) => tile.0 & 0xFF,
      Self::Coordinate { x, y } => ((y & COORD_MAX) << 3) | (x & COORD_MAX),
    };
    id << 8
  }
}

impl fmt::Display for TileSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Linear(tile) => write!(f, "{}", tile),
      Self::Coordinate { x, y } => write!(f, "tile ({}, {})", x, y),
    }
  }
}
