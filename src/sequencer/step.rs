/// Configuration steps and procedures
use serde::{Deserialize, Serialize};

fn default_stride() -> u32 {
  8
}

/// One entry of a configuration procedure.
///
/// Register targets are given either as a raw `offset` or as a `register`
/// name from the catalog. Values are opaque words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConfigStep {
  WriteRegister {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    register: Option<String>,
    value: u32,
  },
  WriteMemory {
    byte_address: u32,
    value: u32,
  },
  StageWords {
    words: Vec<u32>,
    count: usize,
    #[serde(default = "default_stride")]
    stride: u32,
  },
  Delay {
    units: u32,
  },
  /// Emits `value` to the debug sink; `tagged` ors in the tile tag
  Marker {
    value: u32,
    #[serde(default)]
    tagged: bool,
  },
  /// Loads one word. After the load, `marker` is emitted as given and
  /// `value_marker` is emitted with the low 16 bits of the word or'd in.
  Read {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    register: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marker: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_marker: Option<u32>,
  },
  /// Write `sentinel`, read it back, fail on mismatch
  Verify {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    register: Option<String>,
    sentinel: u32,
  },
}

impl ConfigStep {
  pub fn write(offset: u32, value: u32) -> Self {
    Self::WriteRegister {
      offset: Some(offset),
      register: None,
      value,
    }
  }

  pub fn write_named(register: impl Into<String>, value: u32) -> Self {
    Self::WriteRegister {
      offset: None,
      register: Some(register.into()),
      value,
    }
  }

  pub fn write_memory(byte_address: u32, value: u32) -> Self {
    Self::WriteMemory { byte_address, value }
  }

  pub fn delay(units: u32) -> Self {
    Self::Delay { units }
  }

  pub fn marker(value: u32) -> Self {
    Self::Marker { value, tagged: false }
  }

  pub fn tagged_marker(value: u32) -> Self {
    Self::Marker { value, tagged: true }
  }

  pub fn read(offset: u32) -> Self {
    Self::Read {
      offset: Some(offset),
      register: None,
      marker: None,
      value_marker: None,
    }
  }

  pub fn verify(offset: u32, sentinel: u32) -> Self {
    Self::Verify {
      offset: Some(offset),
      register: None,
      sentinel,
    }
  }

  /// The named register this step refers to, if any
  pub fn register_name(&self) -> Option<&str> {
    match self {
      Self::WriteRegister { register, .. } | Self::Read { register, .. } | Self::Verify { register, .. } => {
        register.as_deref()
      },
      _ => None,
    }
  }
}

/// A named, ordered batch of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub steps: Vec<ConfigStep>,
}

impl Procedure {
  pub fn new(name: impl Into<String>, steps: Vec<ConfigStep>) -> Self {
    Self {
      name: name.into(),
      description: String::new(),
      steps,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}
