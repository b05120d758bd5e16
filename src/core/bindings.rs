//! Key and mouse bindings for the window manager command surface
use crate::{core::State, Result};

/// Raw X modifier mask bits.
pub mod modifier {
    /// Shift
    pub const SHIFT: u16 = 1 << 0;
    /// Caps lock
    pub const LOCK: u16 = 1 << 1;
    /// Control
    pub const CONTROL: u16 = 1 << 2;
    /// Mod1 (usually Alt)
    pub const MOD1: u16 = 1 << 3;
    /// Mod2 (usually Num lock)
    pub const MOD2: u16 = 1 << 4;
    /// Mod3
    pub const MOD3: u16 = 1 << 5;
    /// Mod4 (usually Super)
    pub const MOD4: u16 = 1 << 6;
    /// Mod5
    pub const MOD5: u16 = 1 << 7;

    /// Every real modifier bit: the range bindings are compared within.
    pub const ALL: u16 = SHIFT | CONTROL | MOD1 | MOD2 | MOD3 | MOD4 | MOD5;
}

/// X keysym values for the keys used by the default bindings.
///
/// Values are the standard X11 keysym encodings: Latin-1 keys are their
/// character codes, function keys live in the 0xff00 page.
#[allow(missing_docs)]
pub mod keysym {
    pub const XK_SPACE: u32 = 0x20;
    pub const XK_COMMA: u32 = 0x2c;
    pub const XK_PERIOD: u32 = 0x2e;
    pub const XK_0: u32 = 0x30;
    pub const XK_1: u32 = 0x31;
    pub const XK_B: u32 = 0x62;
    pub const XK_C: u32 = 0x63;
    pub const XK_D: u32 = 0x64;
    pub const XK_F: u32 = 0x66;
    pub const XK_H: u32 = 0x68;
    pub const XK_I: u32 = 0x69;
    pub const XK_J: u32 = 0x6a;
    pub const XK_K: u32 = 0x6b;
    pub const XK_L: u32 = 0x6c;
    pub const XK_M: u32 = 0x6d;
    pub const XK_P: u32 = 0x70;
    pub const XK_Q: u32 = 0x71;
    pub const XK_T: u32 = 0x74;
    pub const XK_RETURN: u32 = 0xff0d;
    pub const XK_TAB: u32 = 0xff09;
    pub const XK_NUM_LOCK: u32 = 0xff7f;
}

/// Strip lock modifiers from a mask and restrict it to real modifier bits so
/// that bindings fire regardless of Num lock and Caps lock state.
pub fn clean_mask(mask: u16, numlock_mask: u16) -> u16 {
    mask & !(numlock_mask | modifier::LOCK) & modifier::ALL
}

/// Where on the screen a button press landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickTarget {
    /// One of the tag symbols on the bar
    TagBar,
    /// The layout symbol on the bar
    LayoutSymbol,
    /// The status text area of the bar
    StatusText,
    /// The window title area of the bar
    WinTitle,
    /// A managed client window
    ClientWin,
    /// The root window
    RootWin,
}

/// A grabbable key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    /// Modifier mask that must be held
    pub mods: u16,
    /// The bound keysym
    pub keysym: u32,
}

/// A grabbable button chord and the screen region it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonSpec {
    /// Region the press must land in for the binding to fire
    pub click: ClickTarget,
    /// Modifier mask that must be held
    pub mods: u16,
    /// The bound button number (1..=5)
    pub button: u8,
}

/// An action to run in response to a key press.
pub type KeyAction<X> = Box<dyn FnMut(&mut State, &X) -> Result<()>>;

/// An action to run in response to a button press.
///
/// Tag bar clicks carry the mask of the clicked tag as the final argument.
pub type ButtonAction<X> = Box<dyn FnMut(&mut State, &X, Option<u32>) -> Result<()>>;

/// A key chord bound to an action.
pub struct KeyBinding<X> {
    /// The chord to grab and match against
    pub spec: KeySpec,
    /// The action to run
    pub action: KeyAction<X>,
}

impl<X> std::fmt::Debug for KeyBinding<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBinding").field("spec", &self.spec).finish()
    }
}

/// A button chord bound to an action.
pub struct ButtonBinding<X> {
    /// The chord and click region to match against
    pub spec: ButtonSpec,
    /// The action to run
    pub action: ButtonAction<X>,
}

impl<X> std::fmt::Debug for ButtonBinding<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonBinding")
            .field("spec", &self.spec)
            .finish()
    }
}

/// Pixel metrics for the regions of a bar window.
///
/// Rendering the bar is delegated to an external program, so the widths used
/// to classify clicks are injected through the config rather than measured
/// from a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarMetrics {
    /// Width of each tag symbol cell
    pub tag_cell: u32,
    /// Width of the layout symbol cell
    pub layout_cell: u32,
    /// Width reserved for the status text at the right edge
    pub status_width: u32,
}

impl Default for BarMetrics {
    fn default() -> Self {
        Self {
            tag_cell: 30,
            layout_cell: 40,
            status_width: 300,
        }
    }
}

impl BarMetrics {
    /// Classify a click at bar-relative `x` on a bar of total width `bar_w`.
    ///
    /// Returns the region and, for tag cells, the index of the clicked tag.
    pub fn click_target(&self, n_tags: usize, bar_w: u32, x: i32) -> (ClickTarget, Option<usize>) {
        let x = x.max(0);
        let tags_end = (self.tag_cell as i32) * n_tags as i32;

        if x < tags_end {
            let i = (x as u32 / self.tag_cell) as usize;
            return (ClickTarget::TagBar, Some(i.min(n_tags - 1)));
        }

        if x < tags_end + self.layout_cell as i32 {
            return (ClickTarget::LayoutSymbol, None);
        }

        if x > bar_w as i32 - self.status_width as i32 {
            return (ClickTarget::StatusText, None);
        }

        (ClickTarget::WinTitle, None)
    }
}
