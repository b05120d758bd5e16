//! Data types for working with X events
use crate::{
    pure::geometry::{Point, Rect},
    Xid,
};

/// Wrapper around the low level X event types the window manager reacts to.
///
/// Backends translate raw protocol events into this enum; event types escher
/// has no interest in (including those from unknown extensions) are simply
/// never produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    /// A grabbed mouse button has been pressed
    ButtonPress(ButtonEvent),
    /// A grabbed mouse button has been released
    ButtonRelease(ButtonEvent),
    /// A message has been sent to a particular client
    ClientMessage(ClientMessage),
    /// Client config has changed in some way
    ConfigureNotify(ConfigureEvent),
    /// A client is requesting to be repositioned
    ConfigureRequest(ConfigureRequest),
    /// A client window has been destroyed
    Destroy(Xid),
    /// The mouse pointer has entered a new client window
    Enter(PointerChange),
    /// A part or all of a client has become visible
    Expose(ExposeEvent),
    /// A client has gained input focus
    FocusIn(Xid),
    /// A grabbed key combination has been entered by the user
    KeyPress(KeyEvent),
    /// The keyboard mapping has changed
    MappingNotify {
        /// Whether the change affected the keyboard (as opposed to the
        /// pointer button or modifier mapping)
        keyboard: bool,
    },
    /// A client window is asking to be positioned and rendered on the screen
    MapRequest(Xid),
    /// The pointer has moved with no buttons grabbed
    Motion(MotionEvent),
    /// A client property has changed in some way
    PropertyNotify(PropertyEvent),
    /// A client is being unmapped
    UnmapNotify {
        /// The window being unmapped
        id: Xid,
        /// Synthetic unmaps are a client-initiated request to be withdrawn
        /// rather than evidence of destruction
        synthetic: bool,
    },
}

/// A key press with the modifier state that was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The keysym the pressed keycode resolves to in the current mapping
    pub keysym: u32,
    /// The raw modifier mask held at press time
    pub mask: u16,
}

/// A mouse button press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// The window containing the pointer
    pub id: Xid,
    /// The button number (1..=5)
    pub button: u8,
    /// The raw modifier mask held at press time
    pub mask: u16,
    /// Pointer position in root coordinates
    pub rpt: Point,
    /// Pointer position relative to the event window
    pub wpt: Point,
}

/// Pointer motion in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    /// The window the motion was reported against
    pub id: Xid,
    /// Pointer position in root coordinates
    pub rpt: Point,
    /// Server timestamp of the motion, used to throttle drag updates
    pub time: u32,
}

/// A notification that the pointer has crossed into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerChange {
    /// The window that was entered
    pub id: Xid,
    /// Pointer position in root coordinates
    pub rpt: Point,
    /// Crossings caused by grabs rather than pointer movement are ignored
    pub normal_mode: bool,
    /// Whether the pointer moved from a child window into `id`
    pub inferior: bool,
}

/// A message sent to a client (or the root window) via `SendEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    /// The target window of the message
    pub id: Xid,
    /// The message type atom
    pub dtype: Xid,
    /// The first five 32 bit words of message data
    pub data: [u32; 5],
}

/// A configure request or notification when a client changes position or size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureEvent {
    /// The window that was configured
    pub id: Xid,
    /// The new window geometry
    pub r: Rect,
    /// Whether this is the root window
    pub is_root: bool,
}

/// A client request to be repositioned, restacked or resized.
///
/// Each field the client actually supplied (per the request's value mask) is
/// present; the rest are `None` and must not be forwarded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    /// The window asking to be configured
    pub id: Xid,
    /// Requested x position
    pub x: Option<i32>,
    /// Requested y position
    pub y: Option<i32>,
    /// Requested width
    pub w: Option<u32>,
    /// Requested height
    pub h: Option<u32>,
    /// Requested border width
    pub border_width: Option<u32>,
    /// Requested stacking sibling
    pub sibling: Option<Xid>,
    /// Requested stacking mode (raw protocol value)
    pub stack_mode: Option<u32>,
}

/// A notification that a window region has become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposeEvent {
    /// The window that has become exposed
    pub id: Xid,
    /// How many further expose events are pending for this window
    pub count: usize,
}

/// A property change on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEvent {
    /// The window whose property changed
    pub id: Xid,
    /// The changed property's atom
    pub atom: Xid,
    /// Whether this is the root window
    pub is_root: bool,
}
