/// Global logging setup
use env_logger::Env;
use log::LevelFilter;

/// Initialise `env_logger` at `info`, honouring `RUST_LOG`
pub fn init_log() {
  init_log_with(LevelFilter::Info);
}

/// Initialise `env_logger` with a default level; later calls are ignored
pub fn init_log_with(default_level: LevelFilter) {
  let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()))
    .format_timestamp(None)
    .format_target(false)
    .try_init();
}

/// Default level for the CLI's `--quiet` switch
pub fn level_for(quiet: bool) -> LevelFilter {
  if quiet {
    LevelFilter::Warn
  } else {
    LevelFilter::Info
  }
}
