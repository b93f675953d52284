/// Per-tile serialization of bridge writes
use crate::noc::codec::TileSelector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

/// Lock sets of live links, keyed by the link's allocation
static LINK_LOCKS: OnceLock<Mutex<HashMap<usize, Weak<TileLocks>>>> = OnceLock::new();

/// One lock per tile.
///
/// The address and data windows of a tile are a single latch; a second writer
/// landing between them retargets the first writer's data. Tiles are keyed by
/// selector, so a session must address a tile with one encoding only.
#[derive(Debug, Default)]
pub struct TileLocks {
  locks: Mutex<HashMap<TileSelector, Arc<Mutex<()>>>>,
}

impl TileLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// The lock set shared by every bridge driving `link`.
  ///
  /// Bridges built separately over clones of one `Arc` get the same set, so
  /// their window pairs to a tile still never interleave. The set lives as
  /// long as some bridge holds it.
  pub fn for_link<L: ?Sized>(link: &Arc<L>) -> Arc<TileLocks> {
    let key = Arc::as_ptr(link) as *const () as usize;
    let mut registry = LINK_LOCKS
      .get_or_init(Default::default)
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if let Some(locks) = registry.get(&key).and_then(Weak::upgrade) {
      return locks;
    }
    registry.retain(|_, locks| locks.strong_count() > 0);
    let locks = Arc::new(TileLocks::new());
    registry.insert(key, Arc::downgrade(&locks));
    locks
  }

  /// The lock guarding `tile`, created on first use
  pub fn lock_for(&self, tile: TileSelector) -> Arc<Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(tile).or_default())
  }

  pub fn tile_count(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

/// Acquires a tile lock, ignoring poisoning: every write re-latches the
/// address window before touching the data window.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
  lock.lock().unwrap_or_else(PoisonError::into_inner)
}
