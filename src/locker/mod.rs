pub mod guard;
pub mod registry;

pub use guard::{EntityGuard, HeldLocks, release_all};
pub use registry::{EntityLock, LockClass, LockObserver, LockRegistry, LockStats};
