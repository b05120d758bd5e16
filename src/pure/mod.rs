//! Pure data structures for window manager state
//!
//! Everything in this module is side effect free: no X calls are made and no
//! invariants depend on a live server connection, which is what allows the
//! state machine driving escher to be tested in isolation.
pub mod client;
pub mod geometry;
pub mod monitor;

pub use client::{Client, ClientFlags, SizeHints};
pub use monitor::{rect_to_mon, Monitor};
