//! SNE tile bring-up over the MoSAIC network-on-chip.
//!
//! Tiles expose their control registers through a two-phase address-window /
//! data-window bridge and their local memory through a direct write window.
//! This crate encodes NoC addresses, drives both paths over a pluggable
//! [`NocLink`], and sequences named configuration procedures against a tile.

pub mod bridge;
pub mod config;
pub mod error;
pub mod noc;
pub mod sequencer;
pub mod session;
pub mod utils;

pub use bridge::{BridgeWindows, DirectMemoryWriter, RegisterBridge};
pub use error::{Result, SneError};
pub use noc::{tile_address, NocAddress, NocLink, TileId, TileSelector};
pub use sequencer::{ConfigStep, Procedure, RegisterCatalog, RunReport, Sequencer};
