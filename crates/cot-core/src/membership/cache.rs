use std::{
    collections::HashSet,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::domain::UserId;

/// How long a fetched member list is trusted.
pub const MEMBERS_TTL: Duration = Duration::from_secs(60 * 60);

pub type MemberSet = HashSet<UserId>;

/// Called once each time a stored member set expires.
///
/// Runs on the timer task, so it must schedule work rather than await it.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// Single-entry member cache with a fixed TTL.
///
/// `None` from [`MembershipCache::get`] means "unknown", never "nobody".
#[derive(Clone)]
pub struct MembershipCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    ttl: Duration,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entry: Option<Entry>,
    generation: u64,
    on_expired: Option<ExpiryHook>,
}

struct Entry {
    members: Arc<MemberSet>,
    stored_at: Instant,
    timer: CancellationToken,
}

impl Default for MembershipCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::with_ttl(MEMBERS_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub async fn on_expired(&self, hook: ExpiryHook) {
        self.inner.state.lock().await.on_expired = Some(hook);
    }

    pub async fn get(&self) -> Option<Arc<MemberSet>> {
        let state = self.inner.state.lock().await;
        state.entry.as_ref().map(|e| e.members.clone())
    }

    /// `None` when the member set is unknown.
    pub async fn contains(&self, user: &UserId) -> Option<bool> {
        self.get().await.map(|m| m.contains(user))
    }

    pub async fn expires_in(&self) -> Option<Duration> {
        let state = self.inner.state.lock().await;
        state.entry.as_ref().map(|e| {
            (e.stored_at + self.inner.ttl).saturating_duration_since(Instant::now())
        })
    }

    /// Replace the whole entry and restart its TTL.
    pub async fn set(&self, members: MemberSet) {
        let timer = CancellationToken::new();
        let generation = {
            let mut state = self.inner.state.lock().await;
            if let Some(old) = state.entry.take() {
                old.timer.cancel();
            }
            state.generation += 1;
            state.entry = Some(Entry {
                members: Arc::new(members),
                stored_at: Instant::now(),
                timer: timer.clone(),
            });
            state.generation
        };

        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.expire(generation).await;
                    }
                }
            }
        });
    }
}

impl CacheInner {
    async fn expire(&self, generation: u64) {
        let hook = {
            let mut state = self.state.lock().await;
            // A newer `set` owns the entry now.
            if state.generation != generation || state.entry.is_none() {
                return;
            }
            state.entry = None;
            state.on_expired.clone()
        };

        tracing::debug!(generation, "members cache entry expired");
        if let Some(hook) = hook {
            hook();
        }
    }
}
