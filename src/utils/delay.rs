/// Settle delays between configuration phases
use std::time::Duration;

/// Coarse wait of `units` time units. Only "non-negative, monotonic" is promised.
pub trait Delay: Send + Sync {
  fn delay(&self, units: u32);
}

/// Busy-wait, the way the bring-up firmware spins on a volatile counter
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay {
  pub spins_per_unit: u64,
}

impl SpinDelay {
  pub fn new(spins_per_unit: u64) -> Self {
    Self { spins_per_unit }
  }
}

impl Delay for SpinDelay {
  fn delay(&self, units: u32) {
    let spins = u64::from(units).saturating_mul(self.spins_per_unit);
    for _ in 0..spins {
      std::hint::spin_loop();
    }
  }
}

/// Sleeps the calling thread for `units * unit`
#[derive(Debug, Clone, Copy)]
pub struct SleepDelay {
  pub unit: Duration,
}

impl SleepDelay {
  pub fn new(unit: Duration) -> Self {
    Self { unit }
  }
}

impl Delay for SleepDelay {
  fn delay(&self, units: u32) {
    if units > 0 {
      std::thread::sleep(self.unit.saturating_mul(units));
    }
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
  fn delay(&self, _units: u32) {}
}
