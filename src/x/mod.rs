//! Logic for interacting with the X server
//!
//! All communication with the server goes through the [XConn] trait so that
//! the window manager state machine can be driven by a stub implementation in
//! tests. The production implementation over the x11rb crate lives in
//! [crate::x11rb].
use crate::{
    core::bindings::{ButtonSpec, KeySpec},
    pure::{
        client::SizeHints,
        geometry::{Point, Rect},
    },
    Result, Xid,
};

pub mod atom;
pub mod event;
pub mod property;

#[cfg(test)]
pub mod mock;

pub use atom::{Atom, EWMH_SUPPORTED_ATOMS};
pub use event::{ClientMessage, ConfigureRequest, XEvent};
pub use property::{PropVal, WindowAttributes, WmClass, WmHints, WmState};

/// The named cursors escher requests from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// The default pointer
    Normal,
    /// Shown while a client is dragged
    Move,
    /// Shown while a client is resized
    Resize,
}

/// On screen configuration options for client windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientConfig {
    /// The border width in pixels
    BorderPx(u32),
    /// Absolute size and position on the screen as a [Rect]
    Position(Rect),
    /// Mark this window as stacking directly below the given sibling
    StackBelow(Xid),
    /// Mark this window as stacking above all other windows
    StackTop,
}

/// Window attributes for client windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientAttr {
    /// Border color as an `0xRRGGBB` value
    BorderColor(u32),
    /// The event mask selected on managed client windows
    ClientEventMask,
    /// The event mask selected on the root window by a running window manager
    RootEventMask,
}

/// A handle on a running X11 connection used for issuing X requests.
///
/// Methods with a `Result` return type can fail at the protocol level; pure
/// accessors such as [root][XConn::root] report connection-time data.
pub trait XConn {
    /// The ID of the root window.
    fn root(&self) -> Xid;
    /// The full extent of the X screen in pixels.
    fn screen_rect(&self) -> Rect;
    /// The currently connected monitor regions, in stable enumeration order.
    ///
    /// Backends without a usable multi-monitor extension report a single
    /// monitor covering [screen_rect][XConn::screen_rect].
    fn monitors(&self) -> Result<Vec<Rect>>;
    /// The interned id of a known [Atom].
    fn atom_id(&self, atom: Atom) -> Xid;

    /// Attempt to register as the window manager for this display by
    /// selecting substructure-redirect on the root window.
    ///
    /// # Errors
    /// Returns [Error::WmAlreadyRunning][crate::Error::WmAlreadyRunning] if
    /// another client already holds the redirect.
    fn become_wm(&self) -> Result<()>;
    /// Block and wait for the next event from the X server.
    fn next_event(&self) -> Result<XEvent>;
    /// Flush any pending requests to the X server.
    fn flush(&self);
    /// Flush and wait for all pending requests to be processed.
    fn sync(&self) -> Result<()>;
    /// Discard queued pointer-crossing events.
    ///
    /// Restacking windows under the pointer generates EnterNotify events that
    /// would re-select a client the user never moved the pointer into.
    fn drain_crossing_events(&self);

    /// Create a new unmanaged (override-redirect) InputOutput window.
    fn create_window(&self, r: Rect) -> Result<Xid>;
    /// Destroy an existing window.
    fn destroy_window(&self, id: Xid) -> Result<()>;
    /// Map a window to the screen, making it visible.
    fn map_window(&self, id: Xid) -> Result<()>;
    /// Forcibly terminate a client's connection to the server.
    fn kill_client(&self, id: Xid) -> Result<()>;
    /// The direct children of the root window, bottom-up in stacking order.
    fn query_tree(&self) -> Result<Vec<Xid>>;
    /// The child of the root containing the pointer and the pointer position.
    fn query_pointer(&self) -> Result<(Xid, Point)>;
    /// Reposition the pointer relative to the given window.
    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()>;

    /// Set one or more [ClientAttr] for a given window.
    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()>;
    /// Set the [ClientConfig] for a given window.
    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()>;
    /// Forward a [ConfigureRequest] to the server exactly as the client sent
    /// it, preserving which fields were present.
    fn forward_configure_request(&self, req: &ConfigureRequest) -> Result<()>;
    /// Send a synthetic ConfigureNotify telling a client its current
    /// geometry, as required by ICCCM for ignored configure requests.
    fn send_configure_notify(&self, id: Xid, r: Rect, border_width: u32) -> Result<()>;
    /// Move a window without touching its size.
    fn position_window(&self, id: Xid, p: Point) -> Result<()>;

    /// Give input focus to the given window (revert-to-pointer-root).
    fn set_input_focus(&self, id: Xid) -> Result<()>;
    /// Grab the key bindings on the root window for every lock-modifier
    /// combination.
    fn grab_keys(&self, keys: &[KeySpec], numlock_mask: u16) -> Result<()>;
    /// Grab the button bindings on a client window. Unfocused clients
    /// additionally grab plain button presses so clicking can focus them.
    fn grab_buttons(
        &self,
        id: Xid,
        buttons: &[ButtonSpec],
        focused: bool,
        numlock_mask: u16,
    ) -> Result<()>;
    /// Release every button grab held on a window.
    fn ungrab_buttons(&self, id: Xid) -> Result<()>;
    /// Release a frozen pointer-grab sequence, replaying the press to the
    /// client it landed in.
    fn allow_replay_pointer(&self) -> Result<()>;
    /// Start a pointer grab reporting motion to the window manager. Returns
    /// false if the grab could not be established.
    fn grab_pointer(&self, cursor: Cursor) -> Result<bool>;
    /// Release an active pointer grab.
    fn ungrab_pointer(&self) -> Result<()>;
    /// The modifier bit Num_Lock is currently mapped to (0 if unmapped).
    fn numlock_mask(&self) -> Result<u16>;
    /// Re-fetch the keycode to keysym mapping after a MappingNotify.
    fn refresh_keymap(&self) -> Result<()>;

    /// Request the [WindowAttributes] for a window.
    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes>;
    /// Read a text property, decoding latin-1 or UTF-8 as appropriate.
    fn get_text_prop(&self, id: Xid, atom: Atom) -> Result<Option<String>>;
    /// Read a single window-valued property such as `WM_TRANSIENT_FOR`.
    fn get_window_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>>;
    /// Read the first atom of an atom-valued property.
    fn get_atom_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>>;
    /// Read and summarise `WM_HINTS`.
    fn get_wm_hints(&self, id: Xid) -> Result<Option<WmHints>>;
    /// Read `WM_NORMAL_HINTS`. Missing or malformed hints give the default
    /// (unconstrained) [SizeHints].
    fn get_normal_hints(&self, id: Xid) -> Result<SizeHints>;
    /// Read the `WM_CLASS` pair.
    fn get_wm_class(&self, id: Xid) -> Result<Option<WmClass>>;
    /// Read the ICCCM `WM_STATE` property.
    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>>;
    /// The protocol atoms listed in the window's `WM_PROTOCOLS`.
    fn get_protocols(&self, id: Xid) -> Result<Vec<Xid>>;

    /// Write the urgency summary back to `WM_HINTS`.
    fn set_wm_hints(&self, id: Xid, hints: WmHints) -> Result<()>;
    /// Set the ICCCM `WM_STATE` property.
    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()>;
    /// Replace a property value on a window.
    fn replace_prop(&self, id: Xid, atom: Atom, val: PropVal<'_>) -> Result<()>;
    /// Append a window id to a window-list property.
    fn append_window_prop(&self, id: Xid, atom: Atom, val: Xid) -> Result<()>;
    /// Delete a property from a window.
    fn delete_prop(&self, id: Xid, atom: Atom) -> Result<()>;
    /// Send a [ClientMessage] to its target window.
    fn send_client_message(&self, msg: ClientMessage) -> Result<()>;
}

/// Extended functionality derived from the base [XConn] API.
pub trait XConnExt: XConn + Sized {
    /// Request a window's title following EWMH then ICCCM conventions.
    fn window_title(&self, id: Xid) -> Result<Option<String>> {
        match self.get_text_prop(id, Atom::NetWmName)? {
            Some(name) if !name.is_empty() => Ok(Some(name)),
            _ => self.get_text_prop(id, Atom::WmName),
        }
    }

    /// Check whether a client advertises the given protocol in `WM_PROTOCOLS`.
    fn supports_protocol(&self, id: Xid, proto: Atom) -> Result<bool> {
        let proto = self.atom_id(proto);

        Ok(self.get_protocols(id)?.contains(&proto))
    }

    /// Send a `WM_PROTOCOLS` client message carrying the given protocol atom.
    fn send_protocol_message(&self, id: Xid, proto: Atom) -> Result<()> {
        self.send_client_message(ClientMessage {
            id,
            dtype: self.atom_id(Atom::WmProtocols),
            data: [*self.atom_id(proto), 0, 0, 0, 0],
        })
    }

    /// Update the border color of the given client window.
    fn set_client_border_color(&self, id: Xid, color: impl Into<crate::Color>) -> Result<()> {
        let color = color.into();

        self.set_client_attributes(id, &[ClientAttr::BorderColor(color.rgb_u32())])
    }
}

// Auto impl XConnExt for all XConn impls
impl<T> XConnExt for T where T: XConn {}
