/// Configuration sequencer - runs procedures against one tile
use super::catalog::RegisterCatalog;
use super::step::{ConfigStep, Procedure};
use crate::bridge::{BridgeWindows, DirectMemoryWriter, RegisterBridge, TileLocks};
use crate::error::{Result, SneError};
use crate::noc::codec::TileSelector;
use crate::noc::link::NocLink;
use crate::utils::delay::{Delay, NoDelay};
use crate::utils::sink::{markers, DebugSink, NullSink};
use serde::Serialize;
use std::sync::Arc;

/// One register or memory word read during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readback {
  pub offset: u32,
  pub value: u32,
}

/// What a completed procedure did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub procedure: String,
  pub tile: String,
  pub register_writes: usize,
  pub memory_writes: usize,
  pub delays: usize,
  pub markers: usize,
  pub readbacks: Vec<Readback>,
  pub verified: usize,
}

pub struct Sequencer<L: ?Sized> {
  bridge: RegisterBridge<L>,
  memory: DirectMemoryWriter<L>,
  catalog: RegisterCatalog,
  delay: Arc<dyn Delay>,
  sink: Arc<dyn DebugSink>,
}

impl<L: NocLink + ?Sized> Sequencer<L> {
  pub fn new(link: Arc<L>, windows: BridgeWindows, catalog: RegisterCatalog) -> Self {
    Self {
      bridge: RegisterBridge::new(Arc::clone(&link), windows),
      memory: DirectMemoryWriter::new(link, windows),
      catalog,
      delay: Arc::new(NoDelay),
      sink: Arc::new(NullSink),
    }
  }

  /// Routes procedure, bridge and memory markers to `sink`
  pub fn with_sink(self, sink: Arc<dyn DebugSink>) -> Self {
    Self {
      bridge: self.bridge.with_sink(Arc::clone(&sink)),
      memory: self.memory.with_sink(Arc::clone(&sink)),
      sink,
      ..self
    }
  }

  pub fn with_locks(self, locks: Arc<TileLocks>) -> Self {
    Self {
      bridge: self.bridge.with_locks(locks),
      ..self
    }
  }

  pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
    self.delay = delay;
    self
  }

  pub fn bridge(&self) -> &RegisterBridge<L> {
    &self.bridge
  }

  pub fn memory(&self) -> &DirectMemoryWriter<L> {
    &self.memory
  }

  pub fn catalog(&self) -> &RegisterCatalog {
    &self.catalog
  }

  pub fn run_named(&self, tile: TileSelector, name: &str) -> Result<RunReport> {
    let procedure = self.catalog.procedure(name)?;
    self.run(tile, procedure)
  }

  /// Executes `procedure` step by step on `tile`.
  ///
  /// The first failing step aborts the batch: later steps are not issued and
  /// earlier writes stay in effect.
  pub fn run(&self, tile: TileSelector, procedure: &Procedure) -> Result<RunReport> {
    tile.validate()?;
    log::info!("{}: running {} ({} steps)", tile, procedure.name, procedure.steps.len());

    let mut report = RunReport {
      procedure: procedure.name.clone(),
      tile: tile.to_string(),
      ..RunReport::default()
    };

    self.sink.emit(markers::START | tile.marker_tag());
    for (index, step) in procedure.steps.iter().enumerate() {
      if let Err(e) = self.execute(tile, step, &mut report) {
        log::error!("{}: {} aborted at step {}: {}", tile, procedure.name, index, e);
        return Err(e);
      }
    }
    self.sink.emit(markers::END | tile.marker_tag());

    log::info!(
      "{}: {} done, {} register writes, {} memory writes, {} readbacks",
      tile,
      procedure.name,
      report.register_writes,
      report.memory_writes,
      report.readbacks.len()
    );
    Ok(report)
  }

  fn execute(&self, tile: TileSelector, step: &ConfigStep, report: &mut RunReport) -> Result<()> {
    match step {
      ConfigStep::WriteRegister { offset, register, value } => {
        let offset = self.catalog.resolve(*offset, register.as_deref())?;
        self.bridge.write_register(tile, offset, *value)?;
        report.register_writes += 1;
      },
      ConfigStep::WriteMemory { byte_address, value } => {
        self.memory.write_memory_direct(tile, *byte_address, *value)?;
        report.memory_writes += 1;
      },
      ConfigStep::StageWords { words, count, stride } => {
        report.memory_writes += self.memory.stage_words(tile, words, *count, *stride)?;
      },
      ConfigStep::Delay { units } => {
        self.delay.delay(*units);
        report.delays += 1;
      },
      ConfigStep::Marker { value, tagged } => {
        let marker = if *tagged { value | tile.marker_tag() } else { *value };
        self.sink.emit(marker);
        report.markers += 1;
      },
      ConfigStep::Read {
        offset,
        register,
        marker,
        value_marker,
      } => {
        let offset = self.catalog.resolve(*offset, register.as_deref())?;
        let value = self.bridge.read_register(tile, offset)?;
        report.readbacks.push(Readback { offset, value });
        if let Some(marker) = marker {
          self.sink.emit(*marker);
          report.markers += 1;
        }
        if let Some(value_marker) = value_marker {
          self.sink.emit(value_marker | (value & 0xFFFF));
          report.markers += 1;
        }
      },
      ConfigStep::Verify {
        offset,
        register,
        sentinel,
      } => {
        let offset = self.catalog.resolve(*offset, register.as_deref())?;
        self.self_check(tile, offset, *sentinel)?;
        report.register_writes += 1;
        report.readbacks.push(Readback {
          offset,
          value: *sentinel,
        });
        report.verified += 1;
      },
    }
    Ok(())
  }

  /// Writes `sentinel` through the bridge and reads it back from `offset`
  pub fn self_check(&self, tile: TileSelector, offset: u32, sentinel: u32) -> Result<()> {
    self.bridge.write_register(tile, offset, sentinel)?;
    let actual = self.bridge.read_register(tile, offset)?;

    if actual != sentinel {
      self.sink.emit(markers::TEST_FAIL);
      log::warn!("{}: self-check at {:#x} read {:#010x}, expected {:#010x}", tile, offset, actual, sentinel);
      return Err(SneError::VerificationFailed {
        offset,
        expected: sentinel,
        actual,
      });
    }
    self.sink.emit(markers::TEST_PASS);
    Ok(())
  }
}
