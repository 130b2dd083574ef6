use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam::atomic::AtomicCell;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task;
use tracing::{error, info};

use crate::commands::giveaway::models::{Giveaway, GiveawayStatus, Stats, StoreRoot};
use crate::commands::giveaway::store::GiveawayStore;
use crate::error::{Error, Result};

/// Registry of active giveaways. Every mutation goes through a method that
/// also writes the whole state back to the store before returning.
#[non_exhaustive]
pub struct GiveawayManager {
    root: Mutex<StoreRoot>,
    store: Box<dyn GiveawayStore>,
    // Set when the latest write failed; the next write re-persists everything.
    dirty: AtomicCell<bool>,
}

impl GiveawayManager {
    pub fn new(store: Box<dyn GiveawayStore>) -> Self {
        let root = store.load();

        GiveawayManager {
            root: Mutex::new(root),
            store,
            dirty: AtomicCell::new(false),
        }
    }

    pub(super) fn state(&self) -> MutexGuard<'_, StoreRoot> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Persists the passed state. Failures are logged and remembered, the
    // in-memory state stays authoritative.
    pub(super) fn persist(&self, root: &StoreRoot) {
        match self.save(root) {
            Ok(()) => {
                if self.dirty.swap(false) {
                    info!("Giveaways state persisted again after a failed write");
                }
            }
            Err(err) => {
                self.dirty.store(true);
                error!("{}", err);
            }
        }
    }

    // Writes to the store are blocking file I/O. On a multi-threaded runtime
    // the worker hands its other tasks off while the write is in progress.
    fn save(&self, root: &StoreRoot) -> Result<()> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                task::block_in_place(|| self.store.save(root))
            }
            _ => self.store.save(root),
        }
    }

    // Checks that the latest write to the store has failed.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load()
    }

    // Retries persisting the state after a failed write.
    pub fn flush(&self) {
        if self.is_dirty() {
            let root = self.state();
            self.persist(&root);
        }
    }

    // Adds the giveaway to the active list with an empty participant set.
    pub fn create(&self, giveaway: Giveaway) -> Result<Giveaway> {
        let mut root = self.state();

        if root.position(giveaway.id()).is_some() {
            let message = format!(
                "A giveaway with the `{}` identifier already exists.",
                giveaway.id()
            );
            return Err(Error::Validation(message));
        }

        root.participants
            .insert(giveaway.id().to_string(), BTreeSet::new());
        root.giveaways.push(giveaway.clone());
        root.stats.total_created += 1;
        self.persist(&root);

        info!(
            "Giveaway {} created by {} (prize: {}, winners: {})",
            giveaway.id(),
            giveaway.created_by(),
            giveaway.prize(),
            giveaway.winner_count()
        );
        Ok(giveaway)
    }

    pub fn find_active(&self, id: &str) -> Option<Giveaway> {
        let root = self.state();
        root.giveaways
            .iter()
            .find(|giveaway| giveaway.id() == id)
            .cloned()
    }

    // Returns active giveaways in the creation order.
    pub fn list_active(&self) -> Vec<Giveaway> {
        self.state().giveaways.clone()
    }

    // Returns identifiers of the giveaways whose deadline has passed.
    pub fn due_ids(&self, now: i64) -> Vec<String> {
        self.state()
            .giveaways
            .iter()
            .filter(|giveaway| giveaway.is_due(now))
            .map(|giveaway| giveaway.id().to_string())
            .collect()
    }

    // Drops the giveaway without touching statistics. Removing an unknown
    // identifier does nothing.
    pub fn remove(&self, id: &str) {
        let mut root = self.state();

        match root.position(id) {
            Some(index) => {
                root.giveaways.remove(index);
                root.participants.remove(id);
                self.persist(&root);
            }
            None => (),
        }
    }

    /// Single authoritative check-and-remove for the terminal transitions.
    ///
    /// Under one lock it verifies the giveaway is still active, removes it
    /// with its participants, updates statistics and persists. A concurrent
    /// caller for the same identifier observes `None`.
    pub fn take_active(
        &self,
        id: &str,
        status: GiveawayStatus,
    ) -> Option<(Giveaway, BTreeSet<String>)> {
        if !status.is_terminal() {
            return None;
        }

        let mut root = self.state();
        let index = root.position(id)?;
        let mut giveaway = root.giveaways.remove(index);
        let participants = root.participants.remove(id).unwrap_or_default();
        giveaway.set_status(status);

        match status {
            GiveawayStatus::Completed => {
                root.stats.total_completed += 1;
                root.stats.total_participants += participants.len() as u64;
            }
            GiveawayStatus::Cancelled => root.stats.total_cancelled += 1,
            GiveawayStatus::Active => (),
        }
        self.persist(&root);

        Some((giveaway, participants))
    }

    pub fn stats(&self) -> Stats {
        self.state().stats
    }
}

impl fmt::Debug for GiveawayManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiveawayManager")
            .field("root", &self.state())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
