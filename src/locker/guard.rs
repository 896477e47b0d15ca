use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

use super::{LockClass, LockObserver};
use crate::core::{LockError, Result};

/// Exclusive ownership of one entity lock. Dropping the guard releases
/// the lock, so every exit path of the holder gives it back.
pub struct EntityGuard {
    id: Uuid,
    class: LockClass,
    acquired_at: Instant,
    observer: Option<Arc<dyn LockObserver>>,
    _permit: OwnedMutexGuard<()>,
}

impl EntityGuard {
    pub(super) fn new(
        id: Uuid,
        class: LockClass,
        observer: Option<Arc<dyn LockObserver>>,
        permit: OwnedMutexGuard<()>,
    ) -> Self {
        if let Some(observer) = &observer {
            observer.acquired(class, id);
        }
        Self {
            id,
            class,
            acquired_at: Instant::now(),
            observer,
            _permit: permit,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> LockClass {
        self.class
    }

    /// Releases the lock now.
    pub fn release(self) {}
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        if let Some(observer) = &self.observer {
            observer.released(self.class, self.id);
        }
        debug!(
            class = %self.class,
            entity = %self.id,
            held_us = self.acquired_at.elapsed().as_micros() as u64,
            "lock released"
        );
    }
}

impl fmt::Debug for EntityGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityGuard")
            .field("id", &self.id)
            .field("class", &self.class)
            .finish()
    }
}

/// Locks held by a loaded aggregate, in acquisition order.
///
/// Release happens in reverse order. Releasing twice is a lock error.
#[derive(Debug, Default)]
pub struct HeldLocks {
    guards: Option<Vec<EntityGuard>>,
}

impl HeldLocks {
    pub fn new(guards: Vec<EntityGuard>) -> Self {
        Self {
            guards: Some(guards),
        }
    }

    pub fn is_held(&self) -> bool {
        self.guards.as_ref().is_some_and(|g| !g.is_empty())
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.guards
            .as_ref()
            .map(|g| g.iter().map(EntityGuard::id).collect())
            .unwrap_or_default()
    }

    /// Releases everything; fails when nothing is held anymore.
    pub fn release(&mut self, owner: Uuid) -> Result<()> {
        match self.guards.take() {
            Some(guards) if !guards.is_empty() => {
                release_all(guards);
                Ok(())
            }
            _ => Err(LockError::NotHeld(owner.to_string()).into()),
        }
    }
}

/// Releases guards in reverse acquisition order.
pub fn release_all(mut guards: Vec<EntityGuard>) {
    while let Some(guard) = guards.pop() {
        guard.release();
    }
}

impl Drop for HeldLocks {
    fn drop(&mut self) {
        if let Some(mut guards) = self.guards.take() {
            while let Some(guard) = guards.pop() {
                tracing::warn!(
                    class = %guard.class(),
                    entity = %guard.id(),
                    "aggregate dropped without close, releasing its lock"
                );
                guard.release();
            }
        }
    }
}
