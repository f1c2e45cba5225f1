// Bot registry: owns every live bot and hands out per-bot handles.
//
// Two lock levels. The id map sits behind an RwLock that is only held to
// insert, remove or clone a handle. Each bot has its own Mutex, so work on
// one bot never waits on another bot or on structural changes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::bot::{Bot, BotSnapshot};
use super::clock::{Clock, MonotonicClock};
use super::error::BotError;
use super::id::BotId;

/// Shared, individually locked bot.
pub type BotHandle = Arc<Mutex<Bot>>;

/// Lock a bot, recovering from poisoning. Every bot method leaves the bot
/// consistent, so a panic elsewhere cannot leave it half-updated.
pub fn lock_bot(handle: &BotHandle) -> MutexGuard<'_, Bot> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct BotRegistry {
    bots: RwLock<BTreeMap<BotId, BotHandle>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
    seed: u64,
}

impl BotRegistry {
    /// Registry with an explicit clock and base seed. Bot `n` draws its
    /// timers from its own generator seeded with `seed + n`.
    pub fn new(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            bots: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            clock,
            seed,
        }
    }

    /// Registry on the real monotonic clock. Pass a seed for reproducible
    /// timer draws, or `None` for a random one.
    pub fn with_monotonic_clock(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self::new(Arc::new(MonotonicClock::new()), seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Create a bot in `Idle` at `initial_health` (also its max health).
    pub fn create(&self, initial_health: i64) -> Result<BotId, BotError> {
        let max_health = i32::try_from(initial_health)
            .ok()
            .filter(|h| *h > 0)
            .ok_or(BotError::InvalidInitialHealth(initial_health))?;

        let id = BotId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(id.sequence()));
        let bot = Bot::new(id, max_health, self.clock.clone(), rng);

        self.write_map().insert(id, Arc::new(Mutex::new(bot)));
        tracing::info!(bot_id = %id, initial_health, "Bot created");
        Ok(id)
    }

    /// Look up a bot by its string identifier.
    pub fn get(&self, id: &str) -> Option<BotHandle> {
        let id = id.parse::<BotId>().ok()?;
        self.read_map().get(&id).cloned()
    }

    /// Remove a bot. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let Ok(id) = id.parse::<BotId>() else {
            return false;
        };
        let removed = self.write_map().remove(&id).is_some();
        if removed {
            tracing::info!(bot_id = %id, "Bot removed");
        }
        removed
    }

    /// Reset every bot. Returns how many were reset.
    pub fn reset_all(&self) -> usize {
        let handles = self.list_all();
        for handle in &handles {
            lock_bot(handle).reset();
        }
        tracing::info!(bot_count = handles.len(), "All bots reset");
        handles.len()
    }

    /// Handles to all current bots in creation order. The map lock is
    /// released before this returns.
    pub fn list_all(&self) -> Vec<BotHandle> {
        self.read_map().values().cloned().collect()
    }

    /// Snapshots of all current bots in creation order.
    pub fn snapshots(&self) -> Vec<BotSnapshot> {
        self.list_all()
            .iter()
            .map(|handle| lock_bot(handle).snapshot())
            .collect()
    }

    /// Run `f` against one bot under its lock.
    pub fn with_bot<T>(&self, id: &str, f: impl FnOnce(&mut Bot) -> T) -> Result<T, BotError> {
        let handle = self.get(id).ok_or_else(|| BotError::not_found(id))?;
        let mut bot = lock_bot(&handle);
        Ok(f(&mut bot))
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<BotId, BotHandle>> {
        self.bots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<BotId, BotHandle>> {
        self.bots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRegistry")
            .field("bots", &self.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("seed", &self.seed)
            .finish()
    }
}
