//! Discovery subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/discover/start {target}
//!     → engine.rs (claim the single slot, spawn task)
//!     → host.rs (target → bare host, known-domain table, probe URLs)
//!     → probes via the shared client (capped body reads)
//!     → events::EventHub (info / probe / probe_result / finding / warning)
//! POST /api/discover/stop
//!     → engine.rs (cancel token; task exits at the next probe boundary)
//! ```

pub mod engine;
pub mod host;

pub use engine::{DiscoveryEngine, DiscoveryError, RunOutcome};
pub use host::{extract_host, known_domain, probe_urls, KnownDomain, PROBE_PATHS};
