//! Event fan-out subsystem.
//!
//! # Data Flow
//! ```text
//! discovery task
//!     → event.rs (DiscoveryEvent, serialised once)
//!     → hub.rs (try_send into each subscriber's bounded queue)
//!     → Subscription stream
//!     → SSE response (`data: <json>\n\n`)
//! ```

pub mod event;
pub mod hub;

pub use event::{DiscoveryEvent, EventKind};
pub use hub::{EventHub, Payload, SubscriberId, Subscription};
