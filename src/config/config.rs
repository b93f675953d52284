use crate::bridge::BridgeWindows;
use crate::error::{Result, SneError};
use crate::noc::codec::TileSelector;
use crate::noc::socket::{SOCKET_HOST, SOCKET_PORT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Transport used to reach the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
  /// In-process simulated mesh
  Sim,
  /// TCP link to a co-simulation or `sne serve`
  Socket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayKind {
  Spin,
  Sleep,
  None,
}

/// Which tile and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
  #[serde(default = "default_tile")]
  pub tile: u32,
  /// Mesh position; selects the packed-coordinate encoding when set
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub coord: Option<[u32; 2]>,
  #[serde(default = "default_link")]
  pub link: LinkKind,
  #[serde(default = "default_socket_addr")]
  pub socket_addr: String,
  /// 0 disables the link timeout
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

fn default_tile() -> u32 {
  9
}

fn default_link() -> LinkKind {
  LinkKind::Sim
}

fn default_socket_addr() -> String {
  format!("{}:{}", SOCKET_HOST, SOCKET_PORT)
}

fn default_timeout_ms() -> u64 {
  1000
}

impl Default for SessionSection {
  fn default() -> Self {
    Self {
      tile: default_tile(),
      coord: None,
      link: default_link(),
      socket_addr: default_socket_addr(),
      timeout_ms: default_timeout_ms(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DelaySection {
  #[serde(default = "default_delay_kind")]
  pub kind: DelayKind,
  #[serde(default = "default_spins_per_unit")]
  pub spins_per_unit: u64,
  #[serde(default = "default_unit_us")]
  pub unit_us: u64,
}

fn default_delay_kind() -> DelayKind {
  DelayKind::Spin
}

fn default_spins_per_unit() -> u64 {
  1000
}

fn default_unit_us() -> u64 {
  1
}

impl Default for DelaySection {
  fn default() -> Self {
    Self {
      kind: default_delay_kind(),
      spins_per_unit: default_spins_per_unit(),
      unit_us: default_unit_us(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputSection {
  #[serde(default)]
  pub quiet: bool,
  /// JSON-lines transport trace; empty disables it
  #[serde(default)]
  pub trace_file: String,
  /// JSON run report; empty disables it
  #[serde(default)]
  pub report_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogSection {
  /// Extra catalog layered over the built-in one; empty for none
  #[serde(default)]
  pub path: String,
}

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub session: SessionSection,
  #[serde(default)]
  pub windows: BridgeWindows,
  #[serde(default)]
  pub delay: DelaySection,
  #[serde(default)]
  pub output: OutputSection,
  #[serde(default)]
  pub catalog: CatalogSection,
}

impl AppConfig {
  pub fn selector(&self) -> TileSelector {
    match self.session.coord {
      Some([x, y]) => TileSelector::coordinate(x, y),
      None => TileSelector::linear(self.session.tile),
    }
  }

  pub fn timeout(&self) -> Option<Duration> {
    match self.session.timeout_ms {
      0 => None,
      ms => Some(Duration::from_millis(ms)),
    }
  }
}

/// Command-line values that take precedence over every file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub quiet: bool,
  pub tile: Option<u32>,
  pub coord: Option<(u32, u32)>,
  pub link: Option<LinkKind>,
  pub socket_addr: Option<String>,
  pub timeout_ms: Option<u64>,
  pub trace_file: Option<String>,
  pub report_file: Option<String>,
  pub catalog: Option<String>,
}

/// Built-in defaults
pub fn load_default_config() -> Result<AppConfig> {
  parse_config(DEFAULT_CONFIG)
}

fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str::<AppConfig>(content).map_err(|e| SneError::config(format!("failed to parse TOML config: {}", e)))
}

fn read_table(path: &Path) -> Result<Table> {
  let content =
    fs::read_to_string(path).map_err(|e| SneError::config(format!("cannot read config file {:?}: {}", path, e)))?;
  toml::from_str::<Table>(&content).map_err(|e| SneError::config(format!("failed to parse TOML config {:?}: {}", path, e)))
}

/// Loads a complete config from `path`; missing keys take their defaults
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
  let content =
    fs::read_to_string(path).map_err(|e| SneError::config(format!("cannot read config file {:?}: {}", path, e)))?;
  parse_config(&content)
}

fn merge_tables(base: &mut Table, overlay: Table) {
  for (key, value) in overlay {
    match value {
      Value::Table(nested) => {
        if let Some(Value::Table(existing)) = base.get_mut(&key) {
          merge_tables(existing, nested);
        } else {
          base.insert(key, Value::Table(nested));
        }
      },
      other => {
        base.insert(key, other);
      },
    }
  }
}

/// Layers the keys present in `overlay` over `base`
pub fn merge_config(base: AppConfig, overlay: Table) -> Result<AppConfig> {
  let mut merged = match Value::try_from(&base) {
    Ok(Value::Table(table)) => table,
    Ok(_) => return Err(SneError::config("config did not serialize to a table")),
    Err(e) => return Err(SneError::config(format!("failed to serialize config: {}", e))),
  };
  merge_tables(&mut merged, overlay);
  Value::Table(merged)
    .try_into::<AppConfig>()
    .map_err(|e| SneError::config(format!("invalid merged config: {}", e)))
}

pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
  if overrides.quiet {
    config.output.quiet = true;
  }
  if let Some(tile) = overrides.tile {
    config.session.tile = tile;
    config.session.coord = None;
  }
  if let Some((x, y)) = overrides.coord {
    config.session.coord = Some([x, y]);
  }
  if let Some(link) = overrides.link {
    config.session.link = link;
  }
  if let Some(addr) = &overrides.socket_addr {
    config.session.socket_addr = addr.clone();
  }
  if let Some(ms) = overrides.timeout_ms {
    config.session.timeout_ms = ms;
  }
  if let Some(file) = &overrides.trace_file {
    config.output.trace_file = file.clone();
  }
  if let Some(file) = &overrides.report_file {
    config.output.report_file = file.clone();
  }
  if let Some(path) = &overrides.catalog {
    config.catalog.path = path.clone();
  }
}

pub fn validate_config(config: &AppConfig) -> Result<()> {
  config.selector().validate()?;
  config.windows.validate()?;

  if config.session.link == LinkKind::Socket && config.session.socket_addr.trim().is_empty() {
    return Err(SneError::config("socket_addr cannot be empty for the socket link"));
  }
  if config.delay.kind == DelayKind::Spin && config.delay.spins_per_unit == 0 {
    return Err(SneError::config("spins_per_unit must be positive for the spin delay"));
  }
  Ok(())
}

/// Makes relative output and catalog paths relative to `root`
pub fn resolve_paths(config: &mut AppConfig, root: &Path) {
  config.output.trace_file = resolve_single_path(&config.output.trace_file, root);
  config.output.report_file = resolve_single_path(&config.output.report_file, root);
  config.catalog.path = resolve_single_path(&config.catalog.path, root);
}

fn resolve_single_path(path_str: &str, root: &Path) -> String {
  if path_str.is_empty() || Path::new(path_str).is_absolute() {
    return path_str.to_string();
  }
  root.join(path_str).to_string_lossy().to_string()
}

/// Defaults, then the optional user file, then CLI flags; paths resolved
/// against `root` and the result validated.
pub fn load_and_merge_configs(custom_config_path: Option<&Path>, root: &Path, overrides: &CliOverrides) -> Result<AppConfig> {
  let mut config = load_default_config()?;

  if let Some(custom_path) = custom_config_path {
    let custom_path: PathBuf = if custom_path.is_absolute() {
      custom_path.to_path_buf()
    } else {
      root.join(custom_path)
    };
    config = merge_config(config, read_table(&custom_path)?)?;
    log::debug!("merged config from {:?}", custom_path);
  }

  apply_cli_overrides(&mut config, overrides);
  resolve_paths(&mut config, root);
  validate_config(&config)?;

  Ok(config)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
  }

  #[test]
  fn defaults_target_the_sne_tile() {
    let config = load_default_config().unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.selector(), TileSelector::linear(9));
    assert_eq!(config.windows, BridgeWindows::default());
    assert_eq!(config.timeout(), Some(Duration::from_millis(1000)));
  }

  #[test]
  fn file_overrides_only_the_keys_it_sets() {
    let file = write_config(
      r#"
        [session]
        link = "socket"
        timeout_ms = 0
      "#,
    );
    let config = load_and_merge_configs(Some(file.path()), Path::new("/"), &CliOverrides::default()).unwrap();

    assert_eq!(config.session.link, LinkKind::Socket);
    assert_eq!(config.session.tile, 9);
    assert_eq!(config.session.socket_addr, "127.0.0.1:6100");
    assert_eq!(config.timeout(), None);
    assert_eq!(config.delay.kind, DelayKind::Spin);
  }

  #[test]
  fn cli_tile_replaces_file_coordinate() {
    let file = write_config("[session]\ncoord = [1, 1]\n");
    let dir = tempfile::tempdir().unwrap();

    let from_file = load_and_merge_configs(Some(file.path()), dir.path(), &CliOverrides::default()).unwrap();
    assert_eq!(from_file.selector(), TileSelector::coordinate(1, 1));

    let overrides = CliOverrides {
      tile: Some(3),
      trace_file: Some("trace.jsonl".to_string()),
      ..CliOverrides::default()
    };
    let config = load_and_merge_configs(Some(file.path()), dir.path(), &overrides).unwrap();
    assert_eq!(config.selector(), TileSelector::linear(3));
    assert_eq!(PathBuf::from(&config.output.trace_file), dir.path().join("trace.jsonl"));
  }

  #[test]
  fn overlapping_windows_are_rejected() {
    let file = write_config("[windows]\nconfig_data_offset = 0x80\n");
    let err = load_and_merge_configs(Some(file.path()), Path::new("/"), &CliOverrides::default()).unwrap_err();
    assert!(matches!(err, SneError::Config { .. }));
  }

  #[test]
  fn out_of_mesh_coordinate_is_rejected() {
    let overrides = CliOverrides {
      coord: Some((8, 0)),
      ..CliOverrides::default()
    };
    let err = load_and_merge_configs(None, Path::new("/"), &overrides).unwrap_err();
    assert!(matches!(err, SneError::InvalidCoordinate { x: 8, y: 0 }));
  }

  #[test]
  fn missing_file_is_a_config_error() {
    let err = load_config_file(Path::new("/nonexistent/sne.toml")).unwrap_err();
    assert!(matches!(err, SneError::Config { .. }));
  }
}
