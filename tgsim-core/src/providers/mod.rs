//! Capability providers.
//!
//! Each provider abstracts an external dependency (time, network
//! availability, the process environment, local persistence) so the request
//! client and connection manager can run against mocks in tests and real
//! implementations in production.

mod clock;
mod connectivity;
mod env;
mod storage;

pub use clock::{ClockProvider, MockClock, RealClock, Sleep};
pub use connectivity::{ConnectivityProvider, MockConnectivity, RealConnectivity};
pub use env::{EnvProvider, MockEnv, RealEnv};
pub use storage::{FileStore, KeyValueStore, MemoryStore, STORE_PATH_ENV, default_location};
