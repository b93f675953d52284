//! Error types for SNE bring-up operations

use thiserror::Error;

/// Result type alias for SNE operations
pub type Result<T> = std::result::Result<T, SneError>;

/// Errors surfaced by the address codec, the bridge protocol and the sequencer
#[derive(Debug, Error)]
pub enum SneError {
  /// Offset would alias into the tile-id bits of the NoC address
  #[error("offset {offset:#x} exceeds tile-local limit {limit:#x}")]
  InvalidOffset {
    /// Requested tile-local offset
    offset: u32,
    /// Largest offset the encoding accepts
    limit: u32,
  },

  /// Tile id too wide for the linear encoding
  #[error("tile id {tile} exceeds limit {limit}")]
  InvalidTile { tile: u32, limit: u32 },

  /// Mesh coordinate outside the 3-bit range of the packed encoding
  #[error("mesh coordinate ({x}, {y}) outside 0..=7")]
  InvalidCoordinate {
    /// Column
    x: u32,
    /// Row
    y: u32,
  },

  /// The link primitive itself failed
  #[error("transport failure: {source}")]
  Transport {
    #[from]
    source: std::io::Error,
  },

  /// A blocking link operation did not complete in time
  #[error("link timeout after {duration_ms}ms")]
  LinkTimeout { duration_ms: u64 },

  /// Readback after a register write did not match
  #[error("verification failed at offset {offset:#x}: wrote {expected:#010x}, read {actual:#010x}")]
  VerificationFailed { offset: u32, expected: u32, actual: u32 },

  /// Session configuration or register catalog rejected
  #[error("configuration error: {reason}")]
  Config { reason: String },

  #[error("unknown procedure: {name}")]
  UnknownProcedure { name: String },

  #[error("unknown register: {name}")]
  UnknownRegister { name: String },
}

impl SneError {
  pub fn config(reason: impl Into<String>) -> Self {
    Self::Config { reason: reason.into() }
  }

  /// True for failures of the link rather than of the caller's input
  pub fn is_transport(&self) -> bool {
    matches!(self, Self::Transport { .. } | Self::LinkTimeout { .. })
  }
}
