mod common;

use common::{Call, RecordingLink};
use sne::bridge::{BridgeWindows, DirectMemoryWriter, RegisterBridge, CONFIG_ADDR_OFFSET, CONFIG_DATA_OFFSET};
use sne::noc::codec::{tile_address, AddressEncoding, TileId, TileSelector};
use sne::noc::mesh::SimulatedMesh;
use sne::sequencer::{ConfigStep, RegisterCatalog, Sequencer};
use std::sync::Arc;
use std::thread;

fn recording_link() -> Arc<RecordingLink> {
  Arc::new(RecordingLink::new(SimulatedMesh::new(
    AddressEncoding::Linear,
    BridgeWindows::default(),
  )))
}

fn addr(tile: u32, offset: u32) -> u32 {
  tile_address(TileId(tile), offset).unwrap().raw()
}

#[test]
fn register_write_is_two_ordered_stores() {
  let link = recording_link();
  let bridge = RegisterBridge::new(Arc::clone(&link), BridgeWindows::default());

  bridge.write_register(TileSelector::linear(9), 0x4000, 0x4402_4000).unwrap();

  assert_eq!(
    link.calls(),
    vec![
      Call::Store {
        addr: addr(9, CONFIG_ADDR_OFFSET),
        value: 0x4000
      },
      Call::Store {
        addr: addr(9, CONFIG_DATA_OFFSET),
        value: 0x4402_4000
      },
    ]
  );
}

#[test]
fn write_then_read_round_trips() {
  let link = recording_link();
  let bridge = RegisterBridge::new(Arc::clone(&link), BridgeWindows::default());
  let tile = TileSelector::linear(9);

  bridge.write_register(tile, 0, 0x1234_5678).unwrap();
  assert_eq!(bridge.read_register(tile, 0).unwrap(), 0x1234_5678);
  assert_eq!(link.calls().last(), Some(&Call::Load { addr: addr(9, 0) }));
}

#[test]
fn read_of_wide_offset_issues_nothing() {
  let link = recording_link();
  let bridge = RegisterBridge::new(Arc::clone(&link), BridgeWindows::default());

  assert!(bridge.read_register(TileSelector::linear(9), 0x4000).is_err());
  assert!(link.calls().is_empty());
}

#[test]
fn direct_write_is_one_store_past_the_base() {
  let link = recording_link();
  let writer = DirectMemoryWriter::new(Arc::clone(&link), BridgeWindows::default());

  writer.write_memory_direct(TileSelector::linear(9), 64, 0xCAFE_F00D).unwrap();
  assert_eq!(link.stores(), vec![(addr(9, 0x40 + 64), 0xCAFE_F00D)]);
}

#[test]
fn sixteen_test_words_land_at_stride_eight() {
  let link = recording_link();
  let catalog = RegisterCatalog::builtin().unwrap();
  let words: Vec<u32> = catalog
    .procedure("load-test-data")
    .unwrap()
    .steps
    .iter()
    .find_map(|s| match s {
      ConfigStep::StageWords { words, .. } => Some(words.clone()),
      _ => None,
    })
    .unwrap();
  let sequencer = Sequencer::new(Arc::clone(&link), BridgeWindows::default(), catalog);

  let report = sequencer.run_named(TileSelector::linear(9), "load-test-data").unwrap();
  assert_eq!(report.memory_writes, 16);

  let expected: Vec<(u32, u32)> = (0..16u32).map(|i| (addr(9, 64 + 8 * i), words[i as usize])).collect();
  assert_eq!(link.stores(), expected);
}

#[test]
fn same_tile_writes_never_interleave() {
  const THREADS: u32 = 4;
  const WRITES: u32 = 50;

  let link = Arc::new(RecordingLink::yielding(SimulatedMesh::new(
    AddressEncoding::Linear,
    BridgeWindows::default(),
  )));
  let bridge = Arc::new(RegisterBridge::new(Arc::clone(&link), BridgeWindows::default()));

  let handles: Vec<_> = (0..THREADS)
    .map(|t| {
      let bridge = Arc::clone(&bridge);
      thread::spawn(move || {
        for i in 0..WRITES {
          bridge.write_register(TileSelector::linear(9), t * 0x100 + i, (t << 16) | i).unwrap();
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  let stores = link.stores();
  assert_eq!(stores.len(), (THREADS * WRITES * 2) as usize);
  for pair in stores.chunks(2) {
    let (first, second) = (pair[0], pair[1]);
    assert_eq!(first.0, addr(9, CONFIG_ADDR_OFFSET));
    assert_eq!(second.0, addr(9, CONFIG_DATA_OFFSET));

    let offset = first.1;
    let (t, i) = (offset / 0x100, offset % 0x100);
    assert_eq!(second.1, (t << 16) | i);
  }
  assert_eq!(link.mesh.register(9, 0x100 + 7), Some((1 << 16) | 7));
}

#[test]
fn separate_bridges_over_one_link_never_interleave() {
  const THREADS: u32 = 4;
  const WRITES: u32 = 200;

  let link = Arc::new(RecordingLink::yielding(SimulatedMesh::new(
    AddressEncoding::Linear,
    BridgeWindows::default(),
  )));

  let handles: Vec<_> = (0..THREADS)
    .map(|t| {
      let bridge = RegisterBridge::new(Arc::clone(&link), BridgeWindows::default());
      thread::spawn(move || {
        for i in 0..WRITES {
          bridge.write_register(TileSelector::linear(9), t * 0x100 + i, (t << 16) | i).unwrap();
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  let stores = link.stores();
  assert_eq!(stores.len(), (THREADS * WRITES * 2) as usize);
  for pair in stores.chunks(2) {
    assert_eq!(pair[0].0, addr(9, CONFIG_ADDR_OFFSET));
    assert_eq!(pair[1].0, addr(9, CONFIG_DATA_OFFSET));
    let (t, i) = (pair[0].1 / 0x100, pair[0].1 % 0x100);
    assert_eq!(pair[1].1, (t << 16) | i);
  }
}

#[test]
fn sequencer_and_bridge_on_one_link_share_locks() {
  let link = recording_link();
  let sequencer = Sequencer::new(Arc::clone(&link), BridgeWindows::default(), RegisterCatalog::builtin().unwrap());
  let bridge = RegisterBridge::new(Arc::clone(&link), BridgeWindows::default());
  let other = RegisterBridge::new(recording_link(), BridgeWindows::default());

  assert!(Arc::ptr_eq(sequencer.bridge().locks(), bridge.locks()));
  assert!(!Arc::ptr_eq(bridge.locks(), other.locks()));

  let joined = RegisterBridge::new(recording_link(), BridgeWindows::default()).with_locks(Arc::clone(bridge.locks()));
  assert!(Arc::ptr_eq(joined.locks(), bridge.locks()));
}

#[test]
fn different_tiles_each_keep_their_pairs() {
  let link = Arc::new(RecordingLink::yielding(SimulatedMesh::new(
    AddressEncoding::Linear,
    BridgeWindows::default(),
  )));
  let bridge = Arc::new(RegisterBridge::new(Arc::clone(&link), BridgeWindows::default()));

  let handles: Vec<_> = [3u32, 9]
    .into_iter()
    .map(|tile| {
      let bridge = Arc::clone(&bridge);
      thread::spawn(move || {
        for i in 0..20 {
          bridge.write_register(TileSelector::linear(tile), i, tile * 1000 + i).unwrap();
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  for tile in [3u32, 9] {
    let per_tile: Vec<(u32, u32)> = link
      .stores()
      .into_iter()
      .filter(|(a, _)| TileId(a >> 12) == TileId(tile))
      .collect();
    assert_eq!(per_tile.len(), 40);
    for pair in per_tile.chunks(2) {
      assert_eq!(pair[0].0, addr(tile, CONFIG_ADDR_OFFSET));
      assert_eq!(pair[1], (addr(tile, CONFIG_DATA_OFFSET), tile * 1000 + pair[0].1));
    }
  }
}
