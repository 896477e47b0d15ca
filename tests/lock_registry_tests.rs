mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::World;
use oglike_core::locker::{LockClass, LockObserver, LockRegistry};
use oglike_core::model::AccessMode;
use tokio::time::timeout;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Acquired(LockClass, Uuid),
    Released(LockClass, Uuid),
}

tokio::task_local! {
    /// Index of the load running in the current task.
    static LOAD: usize;
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(Option<usize>, Event)>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().iter().map(|(_, event)| *event).collect()
    }

    /// Events of one load, in the order they happened.
    fn events_of(&self, load: usize) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(tag, _)| *tag == Some(load))
            .map(|(_, event)| *event)
            .collect()
    }

    fn record(&self, event: Event) {
        let tag = LOAD.try_with(|load| *load).ok();
        self.events.lock().unwrap().push((tag, event));
    }
}

impl LockObserver for Recorder {
    fn acquired(&self, class: LockClass, id: Uuid) {
        self.record(Event::Acquired(class, id));
    }

    fn released(&self, class: LockClass, id: Uuid) {
        self.record(Event::Released(class, id));
    }
}

async fn observed_world() -> (World, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let registry = LockRegistry::new().with_observer(recorder.clone());
    (World::with_registry(Arc::new(registry)).await, recorder)
}

#[tokio::test]
async fn test_same_identifier_shares_one_lock() {
    let registry = LockRegistry::new();
    let id = Uuid::new_v4();

    let first = registry.acquire(LockClass::Planet, id).await;
    let second = registry.acquire(LockClass::Planet, id).await;
    assert!(Arc::ptr_eq(&first, &second));

    let other = registry.acquire(LockClass::Planet, Uuid::new_v4()).await;
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(registry.stats().await.entries, 2);
}

#[tokio::test]
async fn test_concurrent_acquisition_is_serialized() {
    let registry = Arc::new(LockRegistry::new());
    let id = Uuid::new_v4();
    let counter = Arc::new(Mutex::new((0usize, 0usize)));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let counter = counter.clone();
        tasks.push(tokio::spawn(async move {
            let _guard = registry.lock(LockClass::Player, id).await;
            {
                let mut c = counter.lock().unwrap();
                c.0 += 1;
                c.1 = c.1.max(c.0);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            counter.lock().unwrap().0 -= 1;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let (inside, max_inside) = *counter.lock().unwrap();
    assert_eq!(inside, 0);
    assert_eq!(max_inside, 1);
    assert!(!registry.is_locked(&id).await);
}

#[tokio::test]
async fn test_planet_load_locks_planet_before_owner() {
    let (world, recorder) = observed_world().await;

    let mut planet = world.instance.planet(world.home, AccessMode::ReadWrite).await.unwrap();
    assert_eq!(
        recorder.events(),
        vec![
            Event::Acquired(LockClass::Planet, world.home),
            Event::Acquired(LockClass::Player, world.player),
        ]
    );

    planet.close().unwrap();
    assert_eq!(
        recorder.events()[2..],
        [
            Event::Released(LockClass::Player, world.player),
            Event::Released(LockClass::Planet, world.home),
        ]
    );
}

#[tokio::test]
async fn test_planet_locks_never_taken_under_player_lock() {
    let (world, recorder) = observed_world().await;

    // (planet, mode) loads; `None` loads the player
    let loads: Vec<(Option<Uuid>, AccessMode)> = vec![
        (Some(world.home), AccessMode::ReadWrite),
        (Some(world.colony), AccessMode::ReadWrite),
        (None, AccessMode::ReadWrite),
        (Some(world.home), AccessMode::ReadOnly),
        (Some(world.colony), AccessMode::ReadOnly),
        (None, AccessMode::ReadOnly),
    ];

    let tasks = loads.iter().copied().enumerate().map(|(index, (planet, mode))| {
        let instance = world.instance.clone();
        let player = world.player;
        tokio::spawn(LOAD.scope(index, async move {
            match planet {
                Some(planet) => {
                    let mut loaded = instance.planet(planet, mode).await.unwrap();
                    tokio::task::yield_now().await;
                    if loaded.is_locked() {
                        loaded.close().unwrap();
                    }
                }
                None => {
                    let mut loaded = instance.player(player, mode).await.unwrap();
                    tokio::task::yield_now().await;
                    if loaded.is_locked() {
                        loaded.close().unwrap();
                    }
                }
            }
        }))
    });
    let results = timeout(Duration::from_secs(5), futures::future::join_all(tasks))
        .await
        .expect("concurrent loads should not deadlock");
    for result in results {
        result.unwrap();
    }

    for (index, (planet, _)) in loads.iter().enumerate() {
        let expected = match planet {
            Some(planet) => vec![
                Event::Acquired(LockClass::Planet, *planet),
                Event::Acquired(LockClass::Player, world.player),
                Event::Released(LockClass::Player, world.player),
                Event::Released(LockClass::Planet, *planet),
            ],
            None => vec![
                Event::Acquired(LockClass::Player, world.player),
                Event::Released(LockClass::Player, world.player),
            ],
        };
        assert_eq!(recorder.events_of(index), expected, "load {}", index);
    }
    assert!(!world.instance.locks().is_locked(&world.player).await);
}

#[tokio::test]
async fn test_second_writer_waits_for_close() {
    let world = World::new().await;
    let mut first = world.instance.planet(world.home, AccessMode::ReadWrite).await.unwrap();

    let instance = world.instance.clone();
    let home = world.home;
    let mut waiting = tokio::spawn(async move { instance.planet(home, AccessMode::ReadWrite).await });

    assert!(timeout(Duration::from_millis(50), &mut waiting).await.is_err());

    first.close().unwrap();
    let mut second = timeout(Duration::from_secs(5), waiting)
        .await
        .expect("load should complete once the lock is released")
        .unwrap()
        .unwrap();
    assert!(second.is_locked());
    second.close().unwrap();
    assert!(!world.instance.locks().is_locked(&world.home).await);
}

#[tokio::test]
async fn test_idle_locks_are_pruned() {
    let config = oglike_core::config::EngineConfig::new().lock_prune_threshold(4);
    let registry = LockRegistry::with_config(&config);

    let kept = Uuid::new_v4();
    let guard = registry.lock(LockClass::Fleet, kept).await;
    for _ in 0..4 {
        drop(registry.lock(LockClass::Fleet, Uuid::new_v4()).await);
    }

    let stats = registry.stats().await;
    assert!(stats.entries <= 4);
    assert_eq!(stats.held, 1);
    assert!(registry.is_locked(&kept).await);
    drop(guard);
}

#[tokio::test]
async fn test_rejected_unlock_keeps_the_other_lock() {
    let registry = LockRegistry::new();
    let planet = registry.acquire(LockClass::Planet, Uuid::new_v4()).await;
    let player = registry.acquire(LockClass::Player, Uuid::new_v4()).await;

    let guard = player.lock().await;
    let (_, guard) = planet.unlock(guard).unwrap_err();
    assert!(player.is_locked());
    assert!(registry.is_locked(&player.id()).await);

    player.unlock(guard).unwrap();
    assert!(!registry.is_locked(&player.id()).await);
}
