//! Collaborators supplied by the host: time, network reachability, the
//! signed-in user, durable local storage and the remote settings store.
//!
//! Each comes with a real implementation and a manual one that tests (and
//! the demo's offline toggle) drive by hand.

pub mod settings;
pub mod storage;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};

pub trait Clock: Send + Sync {
    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;

    /// Wall-clock time in milliseconds since the Unix epoch
    fn timestamp_ms(&self) -> u64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn timestamp_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn timestamp_ms(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Reachability flag flipped by the host (or a test)
#[derive(Clone)]
pub struct ManualConnectivity {
    online: Arc<AtomicBool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Connectivity for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthSubscription(u64);

/// Called with the new user id after every sign-in or sign-out
pub type AuthListener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;

    fn on_auth_state_change(&self, listener: AuthListener) -> AuthSubscription;

    fn remove_auth_listener(&self, id: AuthSubscription) -> bool;
}

#[derive(Default)]
struct IdentityInner {
    user: Option<String>,
    listeners: Vec<(AuthSubscription, AuthListener)>,
    next_listener: u64,
}

/// Signed-in user held in memory. Signing in or out notifies listeners when
/// the user actually changes.
#[derive(Clone, Default)]
pub struct SessionIdentity {
    inner: Arc<Mutex<IdentityInner>>,
}

impl SessionIdentity {
    pub fn new(user: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(IdentityInner {
                user,
                ..IdentityInner::default()
            })),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        self.set_user(Some(user_id.into()));
    }

    pub fn sign_out(&self) {
        self.set_user(None);
    }

    fn set_user(&self, user: Option<String>) {
        let listeners: Vec<AuthListener> = {
            let mut inner = self.inner.lock();
            if inner.user == user {
                return;
            }
            inner.user = user.clone();
            inner.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        // called outside the lock so a listener may read the identity
        for listener in listeners {
            listener(user.as_deref());
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.inner.lock().user.clone()
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> AuthSubscription {
        let mut inner = self.inner.lock();
        let id = AuthSubscription(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        id
    }

    fn remove_auth_listener(&self, id: AuthSubscription) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener, _)| *listener != id);
        inner.listeners.len() != before
    }
}
