//! The managed client state tracked for each top-level window
use crate::{pure::geometry::Rect, Xid};
use bitflags::bitflags;

/// Title used for clients whose name property is unset or unreadable.
pub const BROKEN: &str = "broken";

bitflags! {
    /// Boolean state bits tracked for each managed [Client].
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClientFlags: u8 {
        /// The client's size hints pin it to a single size: it always floats
        const FIXED = 1 << 0;
        /// The client manages its own geometry and is skipped by layouts
        const FLOATING = 1 << 1;
        /// The client has set the urgency hint without holding focus
        const URGENT = 1 << 2;
        /// The client covers the full monitor rect with no border
        const FULLSCREEN = 1 << 3;
        /// The client asks not to be given input focus directly
        const NEVER_FOCUS = 1 << 4;
        /// Saved floating bit from before the last fullscreen transition
        const WAS_FLOATING = 1 << 5;
    }
}

/// WM_NORMAL_HINTS data constraining how a client may be resized.
///
/// A zero max/inc/base value means the corresponding hint is unset, matching
/// the ICCCM convention of absent fields.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SizeHints {
    /// Desired base width subtracted before increment snapping
    pub base_w: u32,
    /// Desired base height subtracted before increment snapping
    pub base_h: u32,
    /// Width resize increment
    pub inc_w: u32,
    /// Height resize increment
    pub inc_h: u32,
    /// Maximum width (0 = unbounded)
    pub max_w: u32,
    /// Maximum height (0 = unbounded)
    pub max_h: u32,
    /// Minimum width
    pub min_w: u32,
    /// Minimum height
    pub min_h: u32,
    /// Minimum aspect ratio (h/w lower bound as min.y/min.x)
    pub min_aspect: f32,
    /// Maximum aspect ratio
    pub max_aspect: f32,
}

impl SizeHints {
    /// Whether these hints pin the client to exactly one size.
    pub fn is_fixed(&self) -> bool {
        self.max_w != 0 && self.max_h != 0 && self.max_w == self.min_w && self.max_h == self.min_h
    }

    /// Constrain `(w, h)` by the full hint set: base size, aspect ratio,
    /// resize increments and min/max bounds.
    fn constrain(&self, mut w: u32, mut h: u32) -> (u32, u32) {
        let base_is_min = self.base_w == self.min_w && self.base_h == self.min_h;

        // Aspect hints apply to the size without the base offset unless the
        // base size doubles as the minimum size (ICCCM)
        if !base_is_min {
            w = w.saturating_sub(self.base_w);
            h = h.saturating_sub(self.base_h);
        }

        if self.min_aspect > 0.0 && self.max_aspect > 0.0 {
            if self.max_aspect < w as f32 / h as f32 {
                w = (h as f32 * self.max_aspect + 0.5) as u32;
            } else if self.min_aspect < h as f32 / w as f32 {
                h = (w as f32 * self.min_aspect + 0.5) as u32;
            }
        }

        if base_is_min {
            w = w.saturating_sub(self.base_w);
            h = h.saturating_sub(self.base_h);
        }

        if self.inc_w > 0 {
            w -= w % self.inc_w;
        }
        if self.inc_h > 0 {
            h -= h % self.inc_h;
        }

        (w, h) = self.clamp_min_max(w + self.base_w, h + self.base_h);

        (w, h)
    }

    /// Only enforce the absolute min/max bounds, skipping base, aspect and
    /// increment handling.
    fn clamp_min_max(&self, mut w: u32, mut h: u32) -> (u32, u32) {
        w = std::cmp::max(w, self.min_w);
        h = std::cmp::max(h, self.min_h);
        if self.max_w > 0 {
            w = std::cmp::min(w, self.max_w);
        }
        if self.max_h > 0 {
            h = std::cmp::min(h, self.max_h);
        }

        (w, h)
    }
}

/// A managed top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// The X window being managed
    pub id: Xid,
    /// Human readable client title
    pub name: String,
    /// Tag bitmask selecting the views this client appears in
    pub tags: u32,
    /// Index of the owning monitor
    pub mon: usize,
    /// Current geometry in root coordinates
    pub geom: Rect,
    /// Saved geometry for restoring after fullscreen / floating transitions
    pub old_geom: Rect,
    /// Current border width in pixels
    pub bw: u32,
    /// Border width the client had before it was managed
    pub old_bw: u32,
    /// WM_NORMAL_HINTS constraints
    pub hints: SizeHints,
    /// Boolean state bits
    pub flags: ClientFlags,
}

impl Client {
    /// A new client for window `id` with the geometry and border it mapped with.
    pub fn new(id: Xid, geom: Rect, initial_bw: u32, mon: usize) -> Self {
        Self {
            id,
            name: BROKEN.to_string(),
            tags: 0,
            mon,
            geom,
            old_geom: geom,
            bw: 0,
            old_bw: initial_bw,
            hints: SizeHints::default(),
            flags: ClientFlags::empty(),
        }
    }

    /// Whether this client appears under the given view mask.
    pub fn is_visible(&self, view: u32) -> bool {
        self.tags & view != 0
    }

    /// Floating clients keep their own geometry and are skipped when tiling.
    pub fn is_floating(&self) -> bool {
        self.flags.contains(ClientFlags::FLOATING)
    }

    /// Whether this client currently covers its whole monitor.
    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(ClientFlags::FULLSCREEN)
    }

    /// Total width including both borders.
    pub fn total_w(&self) -> u32 {
        self.geom.w + 2 * self.bw
    }

    /// Total height including both borders.
    pub fn total_h(&self) -> u32 {
        self.geom.h + 2 * self.bw
    }

    /// Apply position clamping and size hints to a requested geometry.
    ///
    /// The position is clamped so some part of the client stays inside
    /// `bound`: the owning monitor's window area normally, or the whole
    /// screen for interactive moves so clients can be dragged across
    /// monitors. Floating and fullscreen clients skip hint application apart
    /// from the absolute min/max bounds.
    ///
    /// Returns the final geometry and whether it differs from the client's
    /// current one.
    pub fn apply_size_hints(&self, r: Rect, bound: &Rect, interact: bool) -> (Rect, bool) {
        let Rect { mut x, mut y, w, h } = r;
        let mut w = std::cmp::max(1, w);
        let mut h = std::cmp::max(1, h);
        let bw2 = (2 * self.bw) as i32;

        if interact {
            if x > bound.right() {
                x = bound.right() - self.total_w() as i32;
            }
            if y > bound.bottom() {
                y = bound.bottom() - self.total_h() as i32;
            }
            if x + w as i32 + bw2 < bound.x {
                x = bound.x;
            }
            if y + h as i32 + bw2 < bound.y {
                y = bound.y;
            }
        } else {
            if x >= bound.right() {
                x = bound.right() - self.total_w() as i32;
            }
            if y >= bound.bottom() {
                y = bound.bottom() - self.total_h() as i32;
            }
            if x + w as i32 + bw2 <= bound.x {
                x = bound.x;
            }
            if y + h as i32 + bw2 <= bound.y {
                y = bound.y;
            }
        }

        if self.is_fullscreen() || self.is_floating() {
            (w, h) = self.hints.clamp_min_max(w, h);
        } else {
            (w, h) = self.hints.constrain(w, h);
        }

        let applied = Rect { x, y, w, h };

        (applied, applied != self.geom)
    }
}
