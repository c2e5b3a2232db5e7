//! Benchmark utilities.

use entindex_core::{IndexEngine, IndexId};
use entindex_testkit::{day, snapshot_engine, AccountSnapshot, OwnerCache};
use rand::Rng;
use std::rc::Rc;

/// Generate `count` snapshots spread over `accounts` accounts and a year of days.
pub fn random_snapshots(count: usize, accounts: i64) -> Vec<AccountSnapshot> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| AccountSnapshot::new(rng.gen_range(0..accounts), day(rng.gen_range(0..365))))
        .collect()
}

/// A loaded snapshot engine together with the cache that owns its entities.
pub struct LoadedEngine {
    /// The engine.
    pub engine: IndexEngine<Rc<AccountSnapshot>>,
    /// Id of the `(AccountId, EffectiveDate)` index.
    pub by_account: IndexId,
    /// Strong owner of every loaded snapshot.
    pub owner: OwnerCache<AccountSnapshot>,
}

/// Loads `count` random snapshots into a fresh engine.
pub fn loaded_engine(count: usize, accounts: i64) -> LoadedEngine {
    let (mut engine, by_account) = snapshot_engine();
    let mut owner = OwnerCache::new();
    for snapshot in random_snapshots(count, accounts) {
        let handle = owner.hold(snapshot);
        engine.add(&handle).expect("fixture snapshots are valid");
    }
    LoadedEngine {
        engine,
        by_account,
        owner,
    }
}

/// Releases roughly `fraction` of the owner's entities.
pub fn release_fraction(owner: &mut OwnerCache<AccountSnapshot>, fraction: f64) -> usize {
    let mut rng = rand::thread_rng();
    let victims: Vec<_> = owner
        .iter()
        .filter(|_| rng.gen_bool(fraction))
        .map(|s| s.id)
        .collect();
    for id in &victims {
        owner.release(id);
    }
    victims.len()
}
