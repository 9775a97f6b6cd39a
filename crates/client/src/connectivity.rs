//! Device-level connectivity probe.
//!
//! The transport consults this before any I/O so that a device known to
//! be offline fails in sub-millisecond time with no network attempt.
//! Hosts with a platform reachability API implement the trait; everyone
//! else gets [`AlwaysOnline`].

/// A synchronous, non-blocking connectivity check.
pub trait Connectivity: Send + Sync {
    /// Whether the device currently reports network connectivity.
    fn is_online(&self) -> bool;
}

/// Default probe for platforms without a reachability API.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
