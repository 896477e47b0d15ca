// ============================================================================
// Lock Registry
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::EntityGuard;
use crate::config::EngineConfig;
use crate::core::{GameError, LockError};

/// Family of the entity a lock protects. Only used for instrumentation:
/// the same identifier always maps to the same lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockClass {
    Planet,
    Player,
    Fleet,
}

impl fmt::Display for LockClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planet => write!(f, "planet"),
            Self::Player => write!(f, "player"),
            Self::Fleet => write!(f, "fleet"),
        }
    }
}

/// Receives acquisition and release notifications.
pub trait LockObserver: Send + Sync {
    fn acquired(&self, class: LockClass, id: Uuid);
    fn released(&self, class: LockClass, id: Uuid);
}

/// Exclusive lock of a single entity.
pub struct EntityLock {
    id: Uuid,
    class: LockClass,
    mutex: Arc<Mutex<()>>,
    observer: Option<Arc<dyn LockObserver>>,
    wait_warning: Duration,
}

impl EntityLock {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> LockClass {
        self.class
    }

    /// Waits until exclusive ownership is obtained.
    pub async fn lock(&self) -> EntityGuard {
        let started = Instant::now();
        let permit = self.mutex.clone().lock_owned().await;
        let waited = started.elapsed();

        if waited > self.wait_warning {
            warn!(
                class = %self.class,
                entity = %self.id,
                waited_ms = waited.as_millis() as u64,
                "slow lock acquisition"
            );
        } else {
            debug!(class = %self.class, entity = %self.id, "lock acquired");
        }

        EntityGuard::new(self.id, self.class, self.observer.clone(), permit)
    }

    pub fn try_lock(&self) -> Option<EntityGuard> {
        let permit = self.mutex.clone().try_lock_owned().ok()?;
        Some(EntityGuard::new(self.id, self.class, self.observer.clone(), permit))
    }

    /// Explicit release. A guard belonging to another lock is handed back
    /// untouched along with the error, so that lock stays held.
    pub fn unlock(&self, guard: EntityGuard) -> Result<(), (GameError, EntityGuard)> {
        if guard.id() != self.id {
            let error = LockError::NotOwner {
                lock: self.id,
                guard: guard.id(),
            }
            .into();
            return Err((error, guard));
        }
        guard.release();
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.mutex.try_lock().is_err()
    }

    /// Nobody references this lock outside of the registry.
    fn is_idle(self: &Arc<Self>) -> bool {
        Arc::strong_count(self) == 1 && Arc::strong_count(&self.mutex) == 1
    }
}

impl fmt::Debug for EntityLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityLock")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStats {
    pub entries: usize,
    pub held: usize,
}

/// Maps entity identifiers to their lock, creating locks on first use.
///
/// The map has its own synchronization, independent from the entity
/// locks: getting a lock from the registry never waits on an entity.
pub struct LockRegistry {
    locks: RwLock<HashMap<Uuid, Arc<EntityLock>>>,
    observer: Option<Arc<dyn LockObserver>>,
    wait_warning: Duration,
    prune_threshold: usize,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
            observer: None,
            wait_warning: config.lock_wait_warning,
            prune_threshold: config.lock_prune_threshold,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LockObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the lock associated to `id`, shared by every caller.
    pub async fn acquire(&self, class: LockClass, id: Uuid) -> Arc<EntityLock> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(&id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        if let Some(lock) = locks.get(&id) {
            return lock.clone();
        }

        if self.prune_threshold > 0 && locks.len() >= self.prune_threshold {
            let before = locks.len();
            locks.retain(|_, lock| !lock.is_idle());
            debug!(pruned = before - locks.len(), remaining = locks.len(), "idle locks pruned");
        }

        let lock = Arc::new(EntityLock {
            id,
            class,
            mutex: Arc::new(Mutex::new(())),
            observer: self.observer.clone(),
            wait_warning: self.wait_warning,
        });
        locks.insert(id, lock.clone());
        lock
    }

    /// Shorthand for `acquire(..).lock()`.
    pub async fn lock(&self, class: LockClass, id: Uuid) -> EntityGuard {
        let lock = self.acquire(class, id).await;
        lock.lock().await
    }

    pub async fn stats(&self) -> LockStats {
        let locks = self.locks.read().await;
        LockStats {
            entries: locks.len(),
            held: locks.values().filter(|l| l.is_locked()).count(),
        }
    }

    pub async fn is_locked(&self, id: &Uuid) -> bool {
        let locks = self.locks.read().await;
        locks.get(id).is_some_and(|l| l.is_locked())
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
