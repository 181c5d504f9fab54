//! Connectivity provider for offline detection.
//!
//! The request client asks this provider before touching the network and
//! fails fast with an `offline` classification when it reports no
//! connectivity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Provider trait for network availability.
pub trait ConnectivityProvider: Send + Sync {
    /// Whether the platform currently reports network connectivity.
    fn is_online(&self) -> bool;

    /// Check if this is a mock provider.
    fn is_mock(&self) -> bool;
}

/// Real connectivity provider.
///
/// Native targets have no cheap, reliable reachability signal, so this
/// always reports online; unreachable hosts surface as `network` failures
/// from the transport instead.
#[derive(Debug, Clone, Default)]
pub struct RealConnectivity;

impl RealConnectivity {
    /// Create a new real connectivity provider.
    pub fn new() -> Self {
        Self
    }
}

impl ConnectivityProvider for RealConnectivity {
    fn is_online(&self) -> bool {
        true
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock connectivity provider with a switchable online flag.
///
/// # Example
///
/// ```
/// use tgsim_core::providers::{ConnectivityProvider, MockConnectivity};
///
/// let net = MockConnectivity::online();
/// assert!(net.is_online());
///
/// net.set_online(false);
/// assert!(!net.is_online());
/// ```
#[derive(Debug, Clone)]
pub struct MockConnectivity {
    online: Arc<AtomicBool>,
}

impl MockConnectivity {
    /// Create a provider that reports online.
    pub fn online() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a provider that reports offline.
    pub fn offline() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flip the reported connectivity.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for MockConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

impl ConnectivityProvider for MockConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn is_mock(&self) -> bool {
        true
    }
}
