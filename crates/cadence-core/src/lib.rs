//! Shared infrastructure for the cadence-gateway resilience fabric.
//!
//! Every other crate in the workspace depends on this one for three things:
//! - [`GatewayError`], the error kinds shared by every layer
//! - [`Context`], the ambient cancellation handle threaded through blocking calls
//! - the event listener plumbing ([`EventListeners`]) used for observability

pub mod context;
pub mod error;
pub mod events;

pub use context::Context;
pub use error::GatewayError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
