//! sharded key store
//!
//! every key (commitment, nullifier, game) hashes to one shard. a transition
//! names all of its keys up front and locks their shards in ascending order,
//! so transitions on disjoint shards run concurrently and overlapping ones
//! serialise without deadlock.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use arcana_circuit::Fr;
use parking_lot::{Mutex, MutexGuard};

use crate::state::{GameRecord, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Commitment(Fr),
    Nullifier(Fr),
    Game(Fr),
}

#[derive(Debug, Default)]
pub(crate) struct Shard {
    pub resources: HashMap<Fr, Resource>,
    pub nullifiers: HashSet<Fr>,
    pub games: HashMap<Fr, GameRecord>,
}

pub(crate) struct ShardedStore {
    shards: Vec<Mutex<Shard>>,
}

impl ShardedStore {
    pub fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Mutex::new(Shard::default())).collect(),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, key: &Key) -> usize {
        // siphash with fixed keys: stable placement across runs
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// lock the shards of `keys`; `Locked::at(i)` is the shard of `keys[i]`
    pub fn lock<const N: usize>(&self, keys: [Key; N]) -> Locked<'_, N> {
        let indices = keys.map(|k| self.shard_index(&k));
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_unstable();
        order.dedup();

        let guards: Vec<MutexGuard<'_, Shard>> = order.iter().map(|&i| self.shards[i].lock()).collect();
        let slots = indices.map(|i| order.partition_point(|&o| o < i));
        Locked { guards, slots }
    }

    /// single-shard read
    pub fn read<R>(&self, key: Key, f: impl FnOnce(&Shard) -> R) -> R {
        let shard = self.shards[self.shard_index(&key)].lock();
        f(&shard)
    }

    /// visit every shard, one lock at a time
    pub fn for_each(&self, mut f: impl FnMut(&Shard)) {
        for shard in &self.shards {
            f(&shard.lock());
        }
    }
}

pub(crate) struct Locked<'a, const N: usize> {
    guards: Vec<MutexGuard<'a, Shard>>,
    slots: [usize; N],
}

impl<const N: usize> Locked<'_, N> {
    pub fn at(&mut self, key: usize) -> &mut Shard {
        &mut self.guards[self.slots[key]]
    }
}
