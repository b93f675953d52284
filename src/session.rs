/// Session assembly - turns an `AppConfig` into a ready sequencer
use crate::config::{AppConfig, DelayKind, LinkKind};
use crate::error::{Result, SneError};
use crate::noc::link::NocLink;
use crate::noc::mesh::SimulatedMesh;
use crate::noc::socket::SocketLink;
use crate::noc::trace::TraceLink;
use crate::sequencer::{RegisterCatalog, RunReport, Sequencer};
use crate::utils::delay::{Delay, NoDelay, SleepDelay, SpinDelay};
use crate::utils::sink::LogSink;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Opens the configured transport, wrapped in a trace writer when requested
pub fn build_link(config: &AppConfig) -> Result<Arc<dyn NocLink>> {
  let encoding = config.selector().encoding();
  let link: Arc<dyn NocLink> = match config.session.link {
    LinkKind::Sim => Arc::new(SimulatedMesh::new(encoding, config.windows)),
    LinkKind::Socket => {
      log::info!("connecting to {}", config.session.socket_addr);
      Arc::new(SocketLink::connect(config.session.socket_addr.as_str(), config.timeout())?)
    },
  };

  if config.output.trace_file.is_empty() {
    return Ok(link);
  }
  let file = File::create(&config.output.trace_file)
    .map_err(|e| SneError::config(format!("cannot create trace file {}: {}", config.output.trace_file, e)))?;
  log::info!("tracing link calls to {}", config.output.trace_file);
  Ok(Arc::new(TraceLink::new(link, encoding, BufWriter::new(file))))
}

/// Built-in catalog with the configured overlay merged in
pub fn load_catalog(config: &AppConfig) -> Result<RegisterCatalog> {
  let mut catalog = RegisterCatalog::builtin()?;
  if !config.catalog.path.is_empty() {
    let content = fs::read_to_string(&config.catalog.path)
      .map_err(|e| SneError::config(format!("cannot read catalog {}: {}", config.catalog.path, e)))?;
    catalog.merge(RegisterCatalog::from_toml_str(&content)?);
    catalog.validate()?;
  }
  Ok(catalog)
}

pub fn build_delay(config: &AppConfig) -> Arc<dyn Delay> {
  match config.delay.kind {
    DelayKind::Spin => Arc::new(SpinDelay::new(config.delay.spins_per_unit)),
    DelayKind::Sleep => Arc::new(SleepDelay::new(Duration::from_micros(config.delay.unit_us))),
    DelayKind::None => Arc::new(NoDelay),
  }
}

pub fn build_sequencer(config: &AppConfig) -> Result<Sequencer<dyn NocLink>> {
  let link = build_link(config)?;
  let catalog = load_catalog(config)?;
  Ok(
    Sequencer::new(link, config.windows, catalog)
      .with_sink(Arc::new(LogSink))
      .with_delay(build_delay(config)),
  )
}

/// Writes the reports of one invocation as a JSON array
pub fn write_report(path: &Path, reports: &[RunReport]) -> Result<()> {
  let file = File::create(path)?;
  serde_json::to_writer_pretty(BufWriter::new(file), reports)
    .map_err(|e| SneError::config(format!("failed to write report {:?}: {}", path, e)))
}
