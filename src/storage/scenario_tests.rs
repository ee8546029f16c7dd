//! Scenario tests across the storage primitives
//!
//! These tests drive the structures the way a cache or codec layer would:
//! long mixed workloads with periodic maintenance in between.

#[cfg(test)]
mod integration {
    use crate::config::{EngineConfig, MapConfig};
    use crate::error::Error;
    use crate::storage::{IntBuffer, IntMap, MemoryManager, SortedKvStore, UnmanagedMap};
    use std::collections::BTreeMap;

    #[test]
    fn test_map_churn_matches_btreemap() -> crate::error::Result<()> {
        let mut map = UnmanagedMap::with_capacity_power(4)?;
        let mut model = BTreeMap::new();

        // Deterministic pseudo-random workload
        let mut seed: u32 = 0x9E37_79B9;
        for step in 0..20_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let key = (seed % 2048) as i32 - 1024;

            if seed % 3 == 0 {
                assert_eq!(map.try_remove(key), model.remove(&key));
            } else {
                map.set(key, step)?;
                model.insert(key, step);
            }

            if step % 5000 == 0 {
                map.compact()?;
            }
        }

        assert_eq!(map.len(), model.len());
        for (&key, &value) in &model {
            assert_eq!(map.get(key)?, value);
        }
        let mut pairs: Vec<(i32, i32)> = map.iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs, model.into_iter().collect::<Vec<_>>());
        map.debug_validate();

        let stats = map.stats();
        println!(
            "Churn stats: capacity={} count={} tombstones={} load={:.2}",
            stats.capacity, stats.count, stats.tombstones, stats.load_factor
        );

        Ok(())
    }

    #[test]
    fn test_saturated_table_falls_through_to_resize() -> crate::error::Result<()> {
        // Every slot genuinely occupied: compaction cannot help, so each
        // threshold crossing must end in a resize.
        let mut map = IntMap::with_capacity_power(4)?;
        let mut capacities = Vec::new();
        for key in 0..200 {
            map.set(key, key)?;
            assert_eq!(map.stats().tombstones, 0);
            if capacities.last() != Some(&map.capacity()) {
                capacities.push(map.capacity());
            }
        }
        assert_eq!(capacities, vec![16, 32, 64, 128, 256, 512]);
        Ok(())
    }

    #[test]
    fn test_saturated_table_at_max_reports_violation() -> crate::error::Result<()> {
        let config = MapConfig {
            initial_power: 4,
            min_power: 4,
            max_power: 4,
            ..MapConfig::default()
        };
        let mut map = UnmanagedMap::with_config(config)?;
        for key in 0..16 {
            map.set(key, key as u8)?;
        }
        assert!(matches!(map.set(99, 0), Err(Error::InvariantViolation(_))));

        // Compaction reclaims the tombstone left by one removal.
        map.try_remove(0);
        map.set(99, 9)?;
        assert_eq!(map.get(99)?, 9);
        Ok(())
    }

    #[test]
    fn test_sorted_store_batch_maintenance() -> crate::error::Result<()> {
        let mut store = SortedKvStore::with_capacity(8)?;
        for key in (0..1000).rev() {
            store.add(key, key * 3)?;
        }

        let evens: Vec<i32> = (0..1000).step_by(2).collect();
        assert_eq!(store.remove_many(&evens), 500);
        assert_eq!(store.count(), 500);
        assert_eq!(store.slot_count(), 1000);

        assert_eq!(store.compact()?, 500);
        assert_eq!(store.slot_count(), 500);
        assert!(store.keys().all(|k| k % 2 == 1));
        assert_eq!(store.get(501)?, 1503);

        // Reinsert into the compacted store.
        store.add(500, 0)?;
        assert_eq!(store.binary_search(500), Ok(250));
        Ok(())
    }

    #[test]
    fn test_allocator_handles_survive_repeated_compaction() -> crate::error::Result<()> {
        let mut mm = MemoryManager::new(4096)?;
        let mut live = Vec::new();

        for round in 0..8u8 {
            for size in [16usize, 48, 128] {
                let handle = mm.allocate(size)?;
                mm.bytes_mut(handle)?.fill(round.wrapping_mul(31).wrapping_add(size as u8));
                live.push((handle, round, size));
            }
            // Free every other block from this round to fragment the region.
            let start = live.len() - 3;
            let (victim, _, _) = live.remove(start + 1);
            assert!(mm.free(victim));
            mm.compact()?;
        }

        for &(handle, round, size) in &live {
            let expected = round.wrapping_mul(31).wrapping_add(size as u8);
            assert_eq!(mm.size_of(handle)?, size);
            assert!(mm.bytes(handle)?.iter().all(|&b| b == expected));
        }

        let stats = mm.stats();
        assert_eq!(stats.used, 8 * (16 + 128));
        assert_eq!(stats.largest_free_block, stats.free);
        Ok(())
    }

    #[test]
    fn test_buffer_backs_codec_style_rows() -> crate::error::Result<()> {
        // A 4x4 pixel plane with rows 1 and 2 dropped.
        let mut plane = IntBuffer::from_slice(&(0..16).collect::<Vec<i32>>())?;
        let dropped: Vec<usize> = (4..12).collect();
        assert_eq!(plane.remove_multiple(&dropped), 8);
        assert_eq!(plane.as_slice(), &[0, 1, 2, 3, 12, 13, 14, 15]);
        Ok(())
    }

    #[test]
    fn test_engine_config_builds_every_primitive() -> crate::error::Result<()> {
        let config = EngineConfig::from_toml_str(
            r#"
            [map]
            initial_power = 6
            probing = "quadratic"

            [int_map]
            initial_power = 5

            [sorted_store]
            initial_capacity = 0

            [allocator]
            capacity = 256
            "#,
        )?;

        let map = UnmanagedMap::<u64>::with_config(config.map)?;
        assert_eq!(map.capacity(), 64);
        let ints = IntMap::with_config(config.int_map)?;
        assert_eq!(ints.capacity(), 32);
        let store = SortedKvStore::with_config(config.sorted_store)?;
        assert_eq!(store.free_capacity(), 4);
        let mm = MemoryManager::from_config(&config.allocator)?;
        assert_eq!(mm.capacity(), 256);
        Ok(())
    }
}
