/// Builders for the parameterised SNE bring-up helpers.
///
/// Each builder resolves its base registers from the catalog and expands into
/// plain register writes framed by begin/done markers.
use super::catalog::RegisterCatalog;
use super::step::{ConfigStep, Procedure};
use crate::error::{Result, SneError};
use crate::utils::sink::markers;

/// Slice clusters per engine in the reference configuration
pub const CLUSTERS: u32 = 1;
/// Engines in the reference configuration
pub const ENGINES: u32 = 1;

/// Crop window and offsets of one event filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterWindow {
  pub left: u32,
  pub right: u32,
  pub bottom: u32,
  pub top: u32,
  pub filter: u32,
  pub xoffset: u32,
  pub yoffset: u32,
}

impl FilterWindow {
  /// Full `width` x `height` crop at the origin with the filter enabled
  pub fn crop(width: u32, height: u32) -> Self {
    Self {
      left: 0,
      right: width.saturating_sub(1),
      bottom: 0,
      top: height.saturating_sub(1),
      filter: 1,
      xoffset: 0,
      yoffset: 0,
    }
  }
}

/// Transfer parameters of one streamer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamerParams {
  pub streamer: u32,
  pub l2_start: u32,
  pub l2_step: u32,
  pub l0_start: u32,
  pub l0_step: u32,
  pub tran_size: u32,
}

impl StreamerParams {
  pub fn new(streamer: u32, l2_start: u32, tran_size: u32) -> Self {
    Self {
      streamer,
      l2_start,
      l2_step: 4,
      l0_start: 0,
      l0_step: 1,
      tran_size,
    }
  }
}

/// `base + step`, or `InvalidOffset` past the end of the offset space
fn at(base: u32, step: u32) -> Result<u32> {
  base.checked_add(step).ok_or(SneError::InvalidOffset {
    offset: step,
    limit: u32::MAX - base,
  })
}

/// Register `index` of a bank of word-spaced registers starting at `base`
fn indexed(base: u32, index: u32) -> Result<u32> {
  let step = index.checked_mul(4).ok_or(SneError::InvalidOffset {
    offset: index,
    limit: u32::MAX / 4,
  })?;
  at(base, step)
}

pub fn filter_steps(catalog: &RegisterCatalog, slice: u32, group: u32, window: FilterWindow) -> Result<Vec<ConfigStep>> {
  let lbound = window.left | (window.bottom << 16);
  let ubound = window.right | (window.top << 16);
  let offsets = (window.xoffset << 1) | (window.yoffset << 4) | window.filter;
  let index = slice
    .checked_mul(CLUSTERS)
    .and_then(|i| i.checked_add(group))
    .ok_or(SneError::InvalidOffset {
      offset: slice,
      limit: (u32::MAX - group) / CLUSTERS,
    })?;
  let reg = |name: &str| -> Result<u32> { indexed(catalog.register(name)?, index) };

  Ok(vec![
    ConfigStep::marker(markers::FILTER_BEGIN),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_FILTER_MAIN_I_0")?, offsets),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_FILTER_LBOUND_I_0")?, lbound),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_FILTER_UBOUND_I_0")?, ubound),
    ConfigStep::marker(markers::FILTER_DONE),
  ])
}

pub fn sequencer_steps(catalog: &RegisterCatalog, slice: u32, start: u32, end: u32) -> Result<Vec<ConfigStep>> {
  let reg = |name: &str| -> Result<u32> { indexed(catalog.register(name)?, slice) };
  Ok(vec![
    ConfigStep::marker(markers::SEQUENCER_BEGIN),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_ADDR_STEP_I_0")?, 0x0000_0001),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_ADDR_START_I_0")?, start),
    ConfigStep::write(reg("ENGINE_CLOCK_CFG_ADDR_END_I_0")?, end),
    ConfigStep::marker(markers::SEQUENCER_DONE),
  ])
}

pub fn streamer_steps(catalog: &RegisterCatalog, params: StreamerParams) -> Result<Vec<ConfigStep>> {
  let reg = |name: &str| -> Result<u32> { indexed(catalog.register(name)?, params.streamer) };

  Ok(vec![
    ConfigStep::marker(markers::STREAMER_BEGIN),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_MAIN_CTRL_I_0")?, 0),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_TCDM_START_ADDR_I_0")?, params.l2_start),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_TCDM_ADDR_STEP_I_0")?, params.l2_step),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_TCDM_END_ADDR_I_0")?, 0),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_TCDM_TRAN_SIZE_I_0")?, params.tran_size),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_SRAM_START_ADDR_I_0")?, params.l0_start),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_SRAM_ADDR_STEP_I_0")?, params.l0_step),
    ConfigStep::write(reg("SYSTEM_CLOCK_CFG_SRAM_END_ADDR_I_0")?, 0),
    ConfigStep::marker(markers::STREAMER_DONE),
  ])
}

/// Cluster ids, slice and error settings for `engines` engines
pub fn engine_steps(catalog: &RegisterCatalog, engines: u32) -> Result<Vec<ConfigStep>> {
  let cid = catalog.register("ENGINE_CLOCK_CFG_CID_I_0")?;
  let slice = catalog.register("ENGINE_CLOCK_CFG_SLICE_I_0")?;
  let error = catalog.register("ENGINE_CLOCK_CFG_ERROR_I_0")?;

  if let Some(last) = engines.checked_sub(1) {
    indexed(cid.max(slice).max(error), last)?;
  }

  let mut steps = vec![ConfigStep::marker(markers::ENGINE_BEGIN)];
  for i in 0..engines {
    let lane = i.wrapping_mul(4);
    let cid_value = (lane << 24)
      .wrapping_add(lane.wrapping_add(1) << 16)
      .wrapping_add(lane.wrapping_add(2) << 8)
      .wrapping_add(lane.wrapping_add(3));
    steps.push(ConfigStep::write(indexed(cid, i)?, cid_value));
    steps.push(ConfigStep::write(indexed(slice, i)?, 0x0800));
    steps.push(ConfigStep::write(indexed(error, i)?, 0x06));
  }
  steps.push(ConfigStep::marker(markers::ENGINE_DONE));
  Ok(steps)
}

/// Streamer setup followed by a main-control write and a progress marker
fn start_phase(
  catalog: &RegisterCatalog,
  params: StreamerParams,
  ctrl_offset: u32,
  ctrl: u32,
  marker: u32,
) -> Result<Vec<ConfigStep>> {
  let main_ctrl = catalog.register("SYSTEM_CLOCK_CFG_MAIN_CTRL_I_0")?;
  let mut steps = streamer_steps(catalog, params)?;
  steps.push(ConfigStep::write(at(main_ctrl, ctrl_offset)?, ctrl));
  steps.push(ConfigStep::marker(marker));
  Ok(steps)
}

/// Filters, sequencers, engines, crossbar, then the streamer start sequence
pub fn full_bringup(catalog: &RegisterCatalog) -> Result<Procedure> {
  let main_ctrl = catalog.register("SYSTEM_CLOCK_CFG_MAIN_CTRL_I_0")?;
  let mut steps = Vec::new();

  for group in 0..CLUSTERS {
    for slice in 0..ENGINES {
      steps.extend(filter_steps(catalog, slice, group, FilterWindow::crop(32, 32))?);
    }
  }
  for slice in 0..ENGINES {
    steps.extend(sequencer_steps(catalog, slice, 0, 63)?);
  }
  steps.extend(engine_steps(catalog, ENGINES)?);
  steps.push(ConfigStep::write(catalog.register("ENGINE_CLOCK_CFG_PARAMETER_I")?, 0x4402_4000));
  steps.extend(catalog.procedure("crossbar")?.steps.iter().cloned());
  steps.push(ConfigStep::tagged_marker(markers::CONFIG_DONE));

  steps.push(ConfigStep::tagged_marker(markers::START_SEQUENCE));
  steps.extend(start_phase(catalog, StreamerParams::new(0, 0, 321), 0, 0x07, 0x57A5_0001)?);
  steps.extend(start_phase(catalog, StreamerParams::new(1, 0x927C0, 0xFFFF), 4, 0xE03, 0x57A5_0002)?);

  steps.push(ConfigStep::marker(markers::WAIT_BEGIN));
  steps.push(ConfigStep::delay(100_000));
  steps.push(ConfigStep::marker(markers::WAIT_DONE));

  steps.push(ConfigStep::write(main_ctrl, 0x04));
  steps.extend(start_phase(catalog, StreamerParams::new(0, 322 * 4, 3), 0, 0xE07, 0x57A5_0003)?);
  steps.push(ConfigStep::delay(50_000));

  steps.push(ConfigStep::write(main_ctrl, 0x04));
  steps.extend(start_phase(catalog, StreamerParams::new(0, 331 * 4, 0xFFFF), 0, 0xC47, 0x57A5_0004)?);
  steps.push(ConfigStep::delay(200_000));

  Ok(Procedure::new("full-bringup", steps).with_description("Complete SNE configuration and start sequence"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn writes(steps: &[ConfigStep]) -> Vec<(u32, u32)> {
    steps
      .iter()
      .filter_map(|s| match s {
        ConfigStep::WriteRegister {
          offset: Some(offset),
          value,
          ..
        } => Some((*offset, *value)),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn filter_packs_bounds() {
    let catalog = RegisterCatalog::builtin().unwrap();
    let steps = filter_steps(&catalog, 0, 0, FilterWindow::crop(32, 32)).unwrap();
    assert_eq!(
      writes(&steps),
      vec![(0x4070, 0x1), (0x4080, 0x0000_0000), (0x4090, 31 | (31 << 16))]
    );
  }

  #[test]
  fn streamer_is_indexed_by_streamer() {
    let catalog = RegisterCatalog::builtin().unwrap();
    let steps = streamer_steps(&catalog, StreamerParams::new(1, 0x927C0, 0xFFFF)).unwrap();
    let w = writes(&steps);
    assert_eq!(w.len(), 8);
    assert_eq!(w[0], (0x24, 0));
    assert_eq!(w[1], (0x44, 0x927C0));
    assert_eq!(w[4], (0x50, 0xFFFF));
  }

  #[test]
  fn engine_cluster_ids() {
    let catalog = RegisterCatalog::builtin().unwrap();
    let w = writes(&engine_steps(&catalog, 2).unwrap());
    assert_eq!(w[0], (0x4010, 0x0001_0203));
    assert_eq!(w[3], (0x4014, 0x0405_0607));
  }

  #[test]
  fn bringup_ends_with_final_start() {
    let catalog = RegisterCatalog::builtin().unwrap();
    let procedure = full_bringup(&catalog).unwrap();
    let w = writes(&procedure.steps);
    assert!(w.contains(&(0x4000, 0x4402_4000)));
    assert!(procedure
      .steps
      .iter()
      .any(|s| s.register_name() == Some("BUS_CLOCK_CFG_XBAR_SYNCH_I")));
    assert_eq!(*w.last().unwrap(), (0x20, 0xC47));
  }

  #[test]
  fn oversized_index_is_an_offset_error() {
    let catalog = RegisterCatalog::builtin().unwrap();
    let window = FilterWindow::crop(32, 32);

    assert!(matches!(
      filter_steps(&catalog, u32::MAX, 1, window),
      Err(SneError::InvalidOffset { .. })
    ));
    assert!(matches!(
      sequencer_steps(&catalog, 0x4000_0000, 0, 63),
      Err(SneError::InvalidOffset { .. })
    ));
    assert!(matches!(
      streamer_steps(&catalog, StreamerParams::new(u32::MAX / 4, 0, 1)),
      Err(SneError::InvalidOffset { .. })
    ));
    assert!(matches!(
      engine_steps(&catalog, u32::MAX),
      Err(SneError::InvalidOffset { .. })
    ));
  }

  #[test]
  fn overlay_base_near_the_top_does_not_wrap() {
    let mut catalog = RegisterCatalog::builtin().unwrap();
    catalog
      .registers
      .insert("ENGINE_CLOCK_CFG_ADDR_STEP_I_0".to_string(), u32::MAX - 2);
    assert!(sequencer_steps(&catalog, 0, 0, 63).is_ok());
    assert!(matches!(
      sequencer_steps(&catalog, 1, 0, 63),
      Err(SneError::InvalidOffset { offset: 4, limit: 2 })
    ));
  }
}
