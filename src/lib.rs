//! escher: a dynamic tiling window manager for X11.
//!
//! escher is driven entirely by X events: it is the one client holding
//! substructure-redirect on the root window, and every change to the managed
//! window tree flows through the event dispatcher in [core::handle]. Clients
//! are tracked per [Monitor][pure::Monitor] in two orders (arrangement order
//! and focus history) and carry a bitmask of tags; a monitor shows the clients
//! whose tag mask intersects its current view. Layouts are pure functions from
//! the visible tiled clients to screen positions.
//!
//! The X server is only ever touched through the [XConn][x::XConn] trait,
//! making the full state machine testable against a stub connection. The
//! production backend lives in [crate::x11rb] and talks to the server with
//! the `x11rb` crate.
#![warn(
    clippy::complexity,
    clippy::correctness,
    clippy::style,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms
)]

pub mod core;
pub mod pure;
pub mod util;
pub mod x;
pub mod x11rb;

use std::ops::Deref;

/// An X11 ID for a given resource
#[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Xid(pub(crate) u32);

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Xid {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Xid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Xid> for u32 {
    fn from(id: Xid) -> Self {
        id.0
    }
}

/// A simple RGB based color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    rgb: u32,
}

impl Color {
    /// Create a new color from an `0xRRGGBB` hex value.
    pub const fn new_from_hex(rgb: u32) -> Self {
        Self { rgb: rgb & 0xffffff }
    }

    /// The raw `0xRRGGBB` pixel value for this color.
    pub fn rgb_u32(&self) -> u32 {
        self.rgb
    }
}

impl From<u32> for Color {
    fn from(rgb: u32) -> Self {
        Self::new_from_hex(rgb)
    }
}

/// Error variants from the core window manager logic and X backends.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The startup probe for substructure-redirect on the root window failed
    #[error("another window manager is already running")]
    WmAlreadyRunning,

    /// The user supplied configuration is invalid
    #[error("invalid window manager configuration: {reason}")]
    InvalidConfig {
        /// Why the config was rejected
        reason: String,
    },

    /// An error raised by the underlying x11rb backend
    #[error(transparent)]
    X11rb(#[from] crate::x11rb::X11rbError),

    /// Something went wrong spawning a subprocess
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A default method on a test stub was called without an implementation
    #[error("mock method not implemented")]
    UnimplementedMock,
}

/// A Result where the error type is a window manager [Error]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_masks_to_24_bits() {
        let c = Color::new_from_hex(0xff123456);

        assert_eq!(c.rgb_u32(), 0x123456);
    }
}
