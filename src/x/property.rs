//! Typed views of the window properties escher reads and writes
use crate::{pure::geometry::Rect, Xid};

/// The ICCCM `WM_STATE` values escher transitions clients through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WmState {
    /// A window that is not mapped anywhere
    Withdrawn,
    /// A normal visible window
    Normal,
    /// An iconified window
    Iconic,
}

impl From<WmState> for u32 {
    fn from(s: WmState) -> u32 {
        match s {
            WmState::Withdrawn => 0,
            WmState::Normal => 1,
            WmState::Iconic => 3,
        }
    }
}

impl TryFrom<u32> for WmState {
    type Error = u32;

    fn try_from(raw: u32) -> std::result::Result<Self, u32> {
        match raw {
            0 => Ok(WmState::Withdrawn),
            1 => Ok(WmState::Normal),
            3 => Ok(WmState::Iconic),
            other => Err(other),
        }
    }
}

/// The window attribute data consulted when deciding whether and how to
/// manage a window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Current geometry in root coordinates
    pub geom: Rect,
    /// Border width the client configured for itself
    pub border_width: u32,
    /// Windows with override-redirect set are never managed
    pub override_redirect: bool,
    /// Whether the window is currently mapped to the screen
    pub viewable: bool,
}

/// The subset of ICCCM `WM_HINTS` that drives focus and urgency handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    /// The urgency flag is set
    pub urgent: bool,
    /// The input field, when present: `Some(false)` marks a client that
    /// refuses direct input focus
    pub accepts_input: Option<bool>,
}

/// The `WM_CLASS` pair matched against window rules.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WmClass {
    /// The instance (first) member of the class property
    pub instance: String,
    /// The class (second) member of the class property
    pub class: String,
}

/// Property values that can be written to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropVal<'a> {
    /// One or more atom values
    Atom(&'a [Xid]),
    /// One or more cardinal (u32) values
    Cardinal(&'a [u32]),
    /// A UTF-8 string value
    Str(&'a str),
    /// One or more window ids
    Window(&'a [Xid]),
}
