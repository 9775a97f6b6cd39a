//! Process-wide application activity registry.
//!
//! Publishes foreground/background ("active"/"inactive") transitions to
//! any number of subscribers. After a suspend/resume cycle the underlying
//! connection of an in-flight stream is presumed dead, so the registry is
//! the hook that lets external orchestration cancel stale streams on
//! resume via [`Lifecycle::watch_stream`].
//!
//! The registry is an explicit service object: a lazily initialized
//! process-wide instance is available through [`Lifecycle::global`], but
//! tests and embedders can construct their own.

use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock, Weak};
use tokio_util::sync::CancellationToken;

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

/// A source of activity transitions.
///
/// Sources are probed once, in preference order, when the first
/// subscriber registers; exactly one attaches per registry. Platform
/// embedders supply their own (app state APIs, visibility signals) ahead
/// of the default [`HostSource`].
pub trait ActivitySource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Try to attach to this source; `false` means unavailable here.
    fn attach(&self, lifecycle: &Lifecycle) -> bool;
}

/// Passive fallback source.
///
/// Always attaches and never fires on its own: the embedding host pushes
/// transitions through [`Lifecycle::set_active`]. On a plain server the
/// state simply stays active.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSource;

impl ActivitySource for HostSource {
    fn name(&self) -> &'static str {
        "host"
    }

    fn attach(&self, _lifecycle: &Lifecycle) -> bool {
        true
    }
}

/// The activity pub/sub registry.
///
/// Cloning shares the underlying registry. Callback panics are isolated:
/// one failing subscriber never prevents the others from firing.
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    sources: Vec<Box<dyn ActivitySource>>,
}

struct State {
    active: bool,
    attached: bool,
    next_id: u64,
    subscribers: Vec<(u64, Callback)>,
}

impl Lifecycle {
    /// Create a registry with the default source chain.
    pub fn new() -> Self {
        Self::with_sources(vec![Box::new(HostSource)])
    }

    /// Create a registry probing the given sources, in preference order.
    pub fn with_sources(sources: Vec<Box<dyn ActivitySource>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    active: true,
                    attached: false,
                    next_id: 0,
                    subscribers: Vec::new(),
                }),
                sources,
            }),
        }
    }

    /// The process-wide registry, initialized on first use.
    pub fn global() -> &'static Lifecycle {
        static GLOBAL: OnceLock<Lifecycle> = OnceLock::new();
        GLOBAL.get_or_init(Lifecycle::new)
    }

    /// Register a callback for activity transitions.
    ///
    /// The first subscription attaches the registry to its transition
    /// source. The callback fires only when the active state actually
    /// changes. Dropping the returned handle detaches this subscriber
    /// without affecting the others.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        self.attach_source();

        let mut state = self.inner.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, Arc::new(callback)));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Cancel `token` when the application becomes active again.
    ///
    /// Wire the returned handle to an in-flight stream: after a resume
    /// from background the stream's connection cannot still be alive, so
    /// the token fires and the transport surfaces a stream abort.
    pub fn watch_stream(&self, token: CancellationToken) -> Subscription {
        self.subscribe(move |active| {
            if active {
                token.cancel();
            }
        })
    }

    /// Last known active state, without subscribing.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    /// Publish a transition.
    ///
    /// De-duplicated: repeating the current state is a no-op and fires
    /// nothing. Called by the attached source, or directly by hosts using
    /// the passive [`HostSource`].
    pub fn set_active(&self, active: bool) {
        let snapshot: Vec<Callback> = {
            let mut state = self.inner.state.lock();
            if state.active == active {
                return;
            }
            state.active = active;
            state.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
        };

        tracing::debug!(active, "lifecycle transition");
        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(active))).is_err() {
                tracing::error!("lifecycle subscriber panicked, continuing with the rest");
            }
        }
    }

    /// Probe sources once and attach the first available one.
    fn attach_source(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.attached {
                return;
            }
            state.attached = true;
        }
        for source in &self.inner.sources {
            if source.attach(self) {
                tracing::debug!("lifecycle attached to '{}' source", source.name());
                return;
            }
        }
        tracing::debug!("no lifecycle transition source available");
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Lifecycle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Lifecycle")
            .field("active", &state.active)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// Handle to one registered subscriber.
///
/// Unsubscribes on drop; other subscribers are untouched.
#[derive(Debug)]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Detach this subscriber explicitly.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.state.lock().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
