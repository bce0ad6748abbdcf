//! Persistent cache of target-name aliases.
//!
//! The catalog stores the same physical object under heterogeneous names
//! (`M31`, `Andromeda Galaxy`, `NGC224`, …). [`SynonymCache`] maps each
//! target to its alias list, asking an external [`NameResolver`] on a miss
//! and keeping results in a [`SnapshotStore`] across runs.
//!
//! # Concurrency
//!
//! Every target has its own slot guarded by a mutex. Lookups of different
//! targets never wait for each other; a second lookup of a target that is
//! being resolved blocks on that slot and then reads the stored result, so
//! the resolver is called at most once per target. If that call fails, the
//! callers that were already waiting fall back to `[target]` as well; only a
//! lookup started after the failure asks the resolver again.

mod canonical;
mod resolver;
mod snapshot;

pub use canonical::canonicalize;
pub use resolver::{NameResolver, ResolverError, SimbadResolver};
pub use snapshot::{JsonSnapshotFile, MemorySnapshot, SnapshotError, SnapshotStore, SynonymMap};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use tracing::{info, warn};

/// Per-target cache entry.
#[derive(Debug, Default)]
struct Slot {
    aliases: Mutex<Option<Vec<String>>>,
    /// Failed resolver calls, bumped while `aliases` is still locked.
    failures: AtomicUsize,
}

impl Slot {
    fn resolved(aliases: Vec<String>) -> Self {
        Self {
            aliases: Mutex::new(Some(aliases)),
            failures: AtomicUsize::new(0),
        }
    }
}

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Cached,
    Resolved,
    Failed,
}

/// Summary of a warming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Names passed in.
    pub targets: usize,
    /// Names sent to the resolver and stored.
    pub resolved: usize,
    /// Names whose resolution failed; they fall back to themselves.
    pub failed: usize,
}

/// Alias cache with an injected resolver and snapshot store.
pub struct SynonymCache<R, S> {
    resolver: R,
    store: S,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
}

impl<R: NameResolver, S: SnapshotStore> SynonymCache<R, S> {
    /// Create a cache primed with the store's saved snapshot.
    pub fn open(resolver: R, store: S) -> Result<Self, SnapshotError> {
        let entries = store.load()?;
        info!("Loaded {} cached alias lists", entries.len());
        Ok(Self::with_entries(resolver, store, entries))
    }

    /// Create a cache primed with `entries`, ignoring what the store holds.
    pub fn with_entries(resolver: R, store: S, entries: SynonymMap) -> Self {
        let slots = entries
            .into_iter()
            .map(|(target, aliases)| (target, Arc::new(Slot::resolved(aliases))))
            .collect();
        Self {
            resolver,
            store,
            slots: RwLock::new(slots),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Alias list of `target`, resolving and storing it on a miss.
    ///
    /// The list always contains the (trimmed) target. A resolver failure
    /// yields `[target]` without storing anything, both for this call and
    /// for the calls that were waiting on it.
    pub fn lookup(&self, target: &str) -> Vec<String> {
        self.lookup_with_outcome(target).0
    }

    fn lookup_with_outcome(&self, target: &str) -> (Vec<String>, Outcome) {
        let target = target.trim();
        if target.is_empty() {
            return (vec![String::new()], Outcome::Cached);
        }

        let slot = self.slot(target);
        let failures_seen = slot.failures.load(Ordering::SeqCst);
        let mut entry = slot.aliases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(aliases) = entry.as_ref() {
            return (aliases.clone(), Outcome::Cached);
        }
        if slot.failures.load(Ordering::SeqCst) != failures_seen {
            // The call this lookup waited on has just failed
            return (vec![target.to_string()], Outcome::Failed);
        }

        match self.resolver.resolve(target) {
            Ok(identifiers) => {
                let aliases = canonicalize(target, identifiers.as_deref().unwrap_or_default());
                *entry = Some(aliases.clone());
                (aliases, Outcome::Resolved)
            }
            Err(e) => {
                warn!("Failed to resolve aliases for {:?}: {}", target, e);
                slot.failures.fetch_add(1, Ordering::SeqCst);
                (vec![target.to_string()], Outcome::Failed)
            }
        }
    }

    /// Slot for `target`, created empty if missing.
    fn slot(&self, target: &str) -> Arc<Slot> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(target.to_string()).or_default())
    }

    /// Cached alias list of `target`, without consulting the resolver.
    pub fn cached(&self, target: &str) -> Option<Vec<String>> {
        let slot = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(target.trim())?)
        };
        let entry = slot.aliases.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    /// Number of targets with a stored alias list.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored alias list.
    ///
    /// Slots still being resolved by another thread are waited for.
    pub fn snapshot(&self) -> SynonymMap {
        let slots: Vec<(String, Arc<Slot>)> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(target, slot)| (target.clone(), Arc::clone(slot)))
            .collect();

        slots
            .into_iter()
            .filter_map(|(target, slot)| {
                let entry = slot.aliases.lock().unwrap_or_else(PoisonError::into_inner);
                entry.clone().map(|aliases| (target, aliases))
            })
            .collect()
    }

    /// Write the whole cache to the snapshot store.
    pub fn persist(&self) -> Result<(), SnapshotError> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        info!("Saved {} alias lists", snapshot.len());
        Ok(())
    }

    /// Resolve every target that is not cached yet, then persist the cache.
    ///
    /// Failures for individual targets are logged and do not stop the pass.
    /// The cache is persisted even when nothing was resolved.
    pub fn warm<I, T>(&self, targets: I) -> Result<WarmReport, SnapshotError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut report = WarmReport::default();
        for target in targets {
            report.targets += 1;
            match self.lookup_with_outcome(target.as_ref()).1 {
                Outcome::Cached => {}
                Outcome::Resolved => report.resolved += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        info!(
            "Done with alias queries: resolved {} of {} targets ({} failed)",
            report.resolved, report.targets, report.failed
        );
        self.persist()?;
        Ok(report)
    }
}
