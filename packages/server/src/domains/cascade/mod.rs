//! Cascade domain - the consistency engine.
//!
//! Entry points live on `BookingEngine`; `handlers` holds the named cascade
//! reactions; `events` the fact events published after commit.

pub mod engine;
pub mod events;
pub mod handlers;

pub use engine::BookingEngine;
pub use events::DomainEvent;
pub use handlers::CascadeCtx;
