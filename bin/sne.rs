use clap::{Parser, Subcommand};
use sne::config::config::load_and_merge_configs;
use sne::config::{AppConfig, CliOverrides, LinkKind};
use sne::noc::mesh::SimulatedMesh;
use sne::noc::socket::SocketServer;
use sne::session::{build_sequencer, load_catalog, write_report};
use sne::utils::log::{init_log_with, level_for};
use sne::{Result, SneError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// sne - SNE tile bring-up over the MoSAIC NoC
#[derive(Parser, Debug)]
#[command(name = "sne")]
#[command(version = "0.1.0")]
#[command(about = "Configure and exercise the SNE tile through its register bridge", long_about = None)]
struct Args {
  /// Session config file layered over the built-in defaults
  #[arg(short, long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Quiet mode (warnings and errors only)
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Run catalog procedures against one tile
  Run {
    /// Procedures to run, in order
    procedures: Vec<String>,

    /// Linear tile id
    #[arg(short, long, conflicts_with = "coord")]
    tile: Option<u32>,

    /// Mesh position X,Y (packed-coordinate encoding)
    #[arg(long, value_name = "X,Y", value_parser = parse_coord)]
    coord: Option<(u32, u32)>,

    /// Transport: sim or socket
    #[arg(long, value_parser = parse_link)]
    link: Option<LinkKind>,

    /// Socket link address
    #[arg(long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Link timeout in milliseconds, 0 to wait forever
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// JSON-lines trace of every link call
    #[arg(long, value_name = "FILE")]
    trace_file: Option<String>,

    /// JSON report of the run
    #[arg(long, value_name = "FILE")]
    report_file: Option<String>,

    /// Catalog layered over the built-in one
    #[arg(long, value_name = "FILE")]
    catalog: Option<String>,

    /// Sentinel write/readback on register offset 0 before the procedures
    #[arg(long)]
    self_check: bool,

    /// Sentinel for --self-check
    #[arg(long, value_parser = parse_u32, default_value = "0x12345678")]
    sentinel: u32,
  },
  /// Serve a simulated mesh over the socket protocol
  Serve {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:6100")]
    bind: String,
  },
  /// List catalog procedures
  List {
    /// Also print the register map
    #[arg(long)]
    registers: bool,

    #[arg(long, value_name = "FILE")]
    catalog: Option<String>,
  },
  /// Validate config and catalog, then print the effective config
  Check {
    #[arg(long, value_name = "FILE")]
    catalog: Option<String>,
  },
}

fn parse_coord(s: &str) -> std::result::Result<(u32, u32), String> {
  let (x, y) = s.split_once(',').ok_or_else(|| format!("expected X,Y, got {}", s))?;
  let x = x.trim().parse().map_err(|e| format!("bad X: {}", e))?;
  let y = y.trim().parse().map_err(|e| format!("bad Y: {}", e))?;
  Ok((x, y))
}

fn parse_link(s: &str) -> std::result::Result<LinkKind, String> {
  match s.to_lowercase().as_str() {
    "sim" => Ok(LinkKind::Sim),
    "socket" => Ok(LinkKind::Socket),
    other => Err(format!("unknown link: {}", other)),
  }
}

fn parse_u32(s: &str) -> std::result::Result<u32, String> {
  match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    Some(hex) => u32::from_str_radix(hex, 16).map_err(|e| e.to_string()),
    None => s.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
  }
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_log_with(level_for(args.quiet));

  match dispatch(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{}", e);
      ExitCode::FAILURE
    },
  }
}

fn load_config(config: Option<&Path>, overrides: &CliOverrides) -> Result<AppConfig> {
  let root = std::env::current_dir()?;
  load_and_merge_configs(config, &root, overrides)
}

fn dispatch(args: Args) -> Result<()> {
  let config_path = args.config.as_deref();
  let quiet = args.quiet;

  match args.command {
    Cmd::Run {
      procedures,
      tile,
      coord,
      link,
      addr,
      timeout_ms,
      trace_file,
      report_file,
      catalog,
      self_check,
      sentinel,
    } => {
      let overrides = CliOverrides {
        quiet,
        tile,
        coord,
        link,
        socket_addr: addr,
        timeout_ms,
        trace_file,
        report_file,
        catalog,
      };
      let config = load_config(config_path, &overrides)?;
      cmd_run(&config, &procedures, self_check.then_some(sentinel))
    },
    Cmd::Serve { bind } => {
      let config = load_config(config_path, &CliOverrides::default())?;
      cmd_serve(&config, &bind)
    },
    Cmd::List { registers, catalog } => {
      let overrides = CliOverrides {
        catalog,
        ..CliOverrides::default()
      };
      cmd_list(&load_config(config_path, &overrides)?, registers)
    },
    Cmd::Check { catalog } => {
      let overrides = CliOverrides {
        catalog,
        ..CliOverrides::default()
      };
      cmd_check(&load_config(config_path, &overrides)?)
    },
  }
}

fn cmd_run(config: &AppConfig, procedures: &[String], sentinel: Option<u32>) -> Result<()> {
  if procedures.is_empty() && sentinel.is_none() {
    return Err(SneError::config("nothing to run: name a procedure or pass --self-check"));
  }

  let tile = config.selector();
  let sequencer = build_sequencer(config)?;

  if let Some(sentinel) = sentinel {
    sequencer.self_check(tile, 0, sentinel)?;
    log::info!("{}: self-check passed", tile);
  }

  let mut reports = Vec::with_capacity(procedures.len());
  for name in procedures {
    let report = sequencer.run_named(tile, name);
    match report {
      Ok(report) => reports.push(report),
      Err(e) => {
        save_report(config, &reports)?;
        return Err(e);
      },
    }
  }

  for report in &reports {
    for readback in &report.readbacks {
      println!("{} {:#06x} {:#010x}", report.procedure, readback.offset, readback.value);
    }
  }
  save_report(config, &reports)
}

fn save_report(config: &AppConfig, reports: &[sne::RunReport]) -> Result<()> {
  if config.output.report_file.is_empty() {
    return Ok(());
  }
  write_report(Path::new(&config.output.report_file), reports)?;
  log::info!("report written to {}", config.output.report_file);
  Ok(())
}

fn cmd_serve(config: &AppConfig, bind: &str) -> Result<()> {
  let mesh = Arc::new(SimulatedMesh::new(config.selector().encoding(), config.windows));
  let server = SocketServer::bind(bind, mesh)?;
  log::info!("serving simulated mesh on {}", server.local_addr()?);
  server.serve()?;
  Ok(())
}

fn cmd_list(config: &AppConfig, registers: bool) -> Result<()> {
  let catalog = load_catalog(config)?;
  for procedure in &catalog.procedures {
    println!("{:<20} {:>4} steps  {}", procedure.name, procedure.steps.len(), procedure.description);
  }
  if registers {
    println!();
    for (name, offset) in &catalog.registers {
      println!("{:<40} {:#06x}", name, offset);
    }
  }
  Ok(())
}

fn cmd_check(config: &AppConfig) -> Result<()> {
  let catalog = load_catalog(config)?;
  let rendered =
    toml::to_string_pretty(config).map_err(|e| SneError::config(format!("failed to render config: {}", e)))?;
  print!("{}", rendered);
  log::info!(
    "config ok: {} on {:?} link, {} procedures, {} registers",
    config.selector(),
    config.session.link,
    catalog.procedures.len(),
    catalog.registers.len()
  );
  Ok(())
}
