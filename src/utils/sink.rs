/// Debug marker sink
use std::sync::Mutex;

/// Well-known bring-up markers. Phase markers are or-ed with the tile tag.
pub mod markers {
  pub const START: u32 = 0xBEEF_0000;
  pub const CONFIG_DONE: u32 = 0xC0DE_0000;
  pub const START_SEQUENCE: u32 = 0x57A5_0000;
  pub const END: u32 = 0xDEAD_0000;

  pub const DATA_BEGIN: u32 = 0xDA7A_0000;
  pub const DATA_DONE: u32 = 0xDA7A_0001;
  pub const DATA_READ: u32 = 0xDA7A_0010;
  pub const DATA_READ_DONE: u32 = 0xDA7A_0011;
  /// Or'd with the word index of a test-data read
  pub const DATA_INDEX: u32 = 0xDA7A_0020;
  /// Or'd with the low 16 bits of a test-data word
  pub const DATA_VALUE: u32 = 0xDA7A_0030;

  pub const CODE_BEGIN: u32 = 0xC0DE_BE61;
  pub const CODE_END: u32 = 0xC0DE_0001;

  pub const FILTER_BEGIN: u32 = 0xF117_0000;
  pub const FILTER_DONE: u32 = 0xF117_0001;
  pub const SEQUENCER_BEGIN: u32 = 0x5EC0_0000;
  pub const SEQUENCER_DONE: u32 = 0x5EC0_0001;
  pub const STREAMER_BEGIN: u32 = 0x5752_0000;
  pub const STREAMER_DONE: u32 = 0x5752_0001;
  pub const ENGINE_BEGIN: u32 = 0xE461_0000;
  pub const ENGINE_DONE: u32 = 0xE461_0001;
  pub const WAIT_BEGIN: u32 = 0xFA17_0000;
  pub const WAIT_DONE: u32 = 0xFA17_0001;

  pub const TEST: u32 = 0x7E57_0000;
  pub const TEST_PASS: u32 = 0x7E57_0001;
  pub const TEST_FAIL: u32 = 0x7E57_0002;
  /// Or'd with the low 16 bits of the main control register
  pub const TEST_STATUS: u32 = 0x7E57_0003;
}

/// Accepts opaque 32-bit markers at protocol phase boundaries
pub trait DebugSink: Send + Sync {
  fn emit(&self, marker: u32);
}

/// Writes markers to the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DebugSink for LogSink {
  fn emit(&self, marker: u32) {
    log::debug!("[marker] {:#010x}", marker);
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DebugSink for NullSink {
  fn emit(&self, _marker: u32) {}
}

/// Keeps every marker in emission order
#[derive(Debug, Default)]
pub struct RecordingSink {
  markers: Mutex<Vec<u32>>,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn markers(&self) -> Vec<u32> {
    self.markers.lock().map(|m| m.clone()).unwrap_or_default()
  }

  pub fn clear(&self) {
    if let Ok(mut markers) = self.markers.lock() {
      markers.clear();
    }
  }
}

impl DebugSink for RecordingSink {
  fn emit(&self, marker: u32) {
    if let Ok(mut markers) = self.markers.lock() {
      markers.push(marker);
    }
  }
}
