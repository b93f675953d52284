use std::io::{Error, ErrorKind, Read, Result, Write};

// Socket configuration
pub const SOCKET_HOST: &str = "127.0.0.1";
pub const SOCKET_PORT: u16 = 6100;

/// Every frame is four little-endian u32 words
pub const FRAME_WORDS: usize = 4;
pub const FRAME_BYTES: usize = FRAME_WORDS * 4;

pub const STATUS_OK: u32 = 0;
pub const STATUS_ERROR: u32 = 1;

// Message types
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
  StoreReq = 0,
  StoreResp = 1,
  LoadReq = 2,
  LoadResp = 3,
}

impl MsgType {
  pub fn from_u32(raw: u32) -> Option<Self> {
    match raw {
      0 => Some(Self::StoreReq),
      1 => Some(Self::StoreResp),
      2 => Some(Self::LoadReq),
      3 => Some(Self::LoadResp),
      _ => None,
    }
  }
}

// Message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
  pub msg_type: u32,
  pub reserved: u32,
}

impl MsgHeader {
  pub fn new(msg_type: MsgType) -> Self {
    Self {
      msg_type: msg_type as u32,
      reserved: 0,
    }
  }
}

// Store request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreReq {
  pub header: MsgHeader,
  pub addr: u32,
  pub value: u32,
}

// Store response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreResp {
  pub header: MsgHeader,
  pub status: u32,
  pub reserved: u32,
}

// Load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReq {
  pub header: MsgHeader,
  pub addr: u32,
  pub padding: u32,
}

// Load response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadResp {
  pub header: MsgHeader,
  pub value: u32,
  pub status: u32,
}

/// A message that travels as one frame
pub trait Frame: Sized {
  const MSG_TYPE: MsgType;

  fn to_words(&self) -> [u32; FRAME_WORDS];

  fn from_words(words: [u32; FRAME_WORDS]) -> Self;
}

impl Frame for StoreReq {
  const MSG_TYPE: MsgType = MsgType::StoreReq;

  fn to_words(&self) -> [u32; FRAME_WORDS] {
    [self.header.msg_type, self.header.reserved, self.addr, self.value]
  }

  fn from_words(w: [u32; FRAME_WORDS]) -> Self {
    Self {
      header: MsgHeader {
        msg_type: w[0],
        reserved: w[1],
      },
      addr: w[2],
      value: w[3],
    }
  }
}

impl Frame for StoreResp {
  const MSG_TYPE: MsgType = MsgType::StoreResp;

  fn to_words(&self) -> [u32; FRAME_WORDS] {
    [self.header.msg_type, self.header.reserved, self.status, self.reserved]
  }

  fn from_words(w: [u32; FRAME_WORDS]) -> Self {
    Self {
      header: MsgHeader {
        msg_type: w[0],
        reserved: w[1],
      },
      status: w[2],
      reserved: w[3],
    }
  }
}

impl Frame for LoadReq {
  const MSG_TYPE: MsgType = MsgType::LoadReq;

  fn to_words(&self) -> [u32; FRAME_WORDS] {
    [self.header.msg_type, self.header.reserved, self.addr, self.padding]
  }

  fn from_words(w: [u32; FRAME_WORDS]) -> Self {
    Self {
      header: MsgHeader {
        msg_type: w[0],
        reserved: w[1],
      },
      addr: w[2],
      padding: w[3],
    }
  }
}

impl Frame for LoadResp {
  const MSG_TYPE: MsgType = MsgType::LoadResp;

  fn to_words(&self) -> [u32; FRAME_WORDS] {
    [self.header.msg_type, self.header.reserved, self.value, self.status]
  }

  fn from_words(w: [u32; FRAME_WORDS]) -> Self {
    Self {
      header: MsgHeader {
        msg_type: w[0],
        reserved: w[1],
      },
      value: w[2],
      status: w[3],
    }
  }
}

/// Reads one raw frame
pub fn read_frame<R: Read>(stream: &mut R) -> Result<[u32; FRAME_WORDS]> {
  let mut bytes = [0u8; FRAME_BYTES];
  stream.read_exact(&mut bytes)?;
  let mut words = [0u32; FRAME_WORDS];
  for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
    *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
  }
  Ok(words)
}

/// Reads one frame and checks it carries the expected message type
pub fn read_struct<T: Frame, R: Read>(stream: &mut R) -> Result<T> {
  let words = read_frame(stream)?;
  if words[0] != T::MSG_TYPE as u32 {
    return Err(Error::new(
      ErrorKind::InvalidData,
      format!("expected msg_type {:?}, got {}", T::MSG_TYPE, words[0]),
    ));
  }
  Ok(T::from_words(words))
}

pub fn write_struct<T: Frame, W: Write>(stream: &mut W, data: &T) -> Result<()> {
  let mut bytes = [0u8; FRAME_BYTES];
  for (chunk, word) in bytes.chunks_exact_mut(4).zip(data.to_words()) {
    chunk.copy_from_slice(&word.to_le_bytes());
  }
  stream.write_all(&bytes)?;
  stream.flush()
}
