use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{error, info};

/// Backing store for the process-wide trading flag.
///
/// `get` returns `None` when the flag was never written.
pub trait KillSwitchStore: Send + Sync {
    fn get(&self) -> Option<bool>;
    fn set(&self, active: bool);
}

const UNSET: u8 = 0;
const ACTIVE: u8 = 1;
const INACTIVE: u8 = 2;

/// Lock-free store for a single process.
#[derive(Debug, Default)]
pub struct InMemoryKillSwitchStore {
    state: AtomicU8,
}

impl InMemoryKillSwitchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KillSwitchStore for InMemoryKillSwitchStore {
    fn get(&self) -> Option<bool> {
        match self.state.load(Ordering::Acquire) {
            ACTIVE => Some(true),
            INACTIVE => Some(false),
            _ => None,
        }
    }

    fn set(&self, active: bool) {
        let v = if active { ACTIVE } else { INACTIVE };
        self.state.store(v, Ordering::Release);
    }
}

/// Shared handle to the kill switch. Cloning shares the underlying store.
///
/// An unset store reads as active (trading allowed).
#[derive(Clone)]
pub struct KillSwitch {
    store: Arc<dyn KillSwitchStore>,
}

impl KillSwitch {
    pub fn new(store: Arc<dyn KillSwitchStore>) -> Self {
        Self { store }
    }

    /// Fresh in-memory switch, initially unset.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKillSwitchStore::new()))
    }

    pub fn is_active(&self) -> bool {
        self.store.get().unwrap_or(true)
    }

    /// Halts trading. Returns true if the switch was active before the call.
    pub fn trip(&self, reason: &str) -> bool {
        let was_active = self.is_active();
        self.store.set(false);
        if was_active {
            error!(reason, "Kill switch tripped, trading halted");
        }
        was_active
    }

    pub fn reactivate(&self) {
        self.store.set(true);
        info!("Kill switch reactivated, trading resumed");
    }
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("active", &self.is_active())
            .finish()
    }
}
