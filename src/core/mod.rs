//! Core data structures and window manager behavior
//!
//! The [State] struct owns every managed [Client] and [Monitor] and is only
//! ever mutated on the event loop thread, between event fetches. All X side
//! effects flow through the [XConn] handed to the free functions in this
//! module, so the whole state machine can be driven by a stub connection in
//! tests.
use crate::{
    core::{
        bindings::{ButtonBinding, ButtonSpec, KeyBinding, KeySpec},
        layout::Layout,
    },
    pure::{
        client::{Client, ClientFlags, BROKEN},
        geometry::{Point, Rect},
        monitor::{rect_to_mon, Monitor},
    },
    x::{Atom, ClientAttr, ClientConfig, PropVal, WindowAttributes, WmState, XConn, XConnExt},
    Color, Error, Result, Xid,
};
use nix::sys::{
    signal::{signal, SigHandler, Signal},
    wait::{waitpid, WaitPidFlag, WaitStatus},
};
use std::collections::HashMap;
use tracing::{debug, error, info, trace};

pub mod actions;
pub mod bindings;
pub mod handle;
pub mod layout;

use bindings::BarMetrics;

/// The maximum number of tags a [Config] may name: tag masks are u32 bit
/// arrays.
pub const MAX_TAGS: usize = 31;

/// A pattern matched against new clients to preset their tags, floating
/// state and target monitor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Substring required in the client's WM_CLASS class member
    pub class: Option<String>,
    /// Substring required in the client's WM_CLASS instance member
    pub instance: Option<String>,
    /// Substring required in the client title
    pub title: Option<String>,
    /// Tags to assign (0 keeps the monitor's current view)
    pub tags: u32,
    /// Whether matching clients start out floating
    pub is_floating: bool,
    /// Monitor to place matching clients on
    pub monitor: Option<usize>,
}

/// The user facing configuration for the window manager.
///
/// This is a plain value built by the binary at startup: escher has no
/// config file and no runtime reload.
#[derive(Debug, Clone)]
pub struct Config {
    /// Names of the virtual workspaces
    pub tags: Vec<String>,
    /// Initial master area fraction for new monitors
    pub mfact: f32,
    /// Initial master client count for new monitors
    pub nmaster: u32,
    /// Border width applied to managed clients
    pub border_width: u32,
    /// Pixel threshold for snapping dragged clients to the window area edge
    pub snap: u32,
    /// Whether new monitors reserve a bar strip
    pub show_bar: bool,
    /// Whether the bar strip sits at the top of the screen
    pub top_bar: bool,
    /// Height of the bar strip in pixels
    pub bar_height: u32,
    /// Border color for unfocused clients
    pub normal_border: Color,
    /// Border color for the focused client
    pub focused_border: Color,
    /// Border color for urgent clients
    pub urgent_border: Color,
    /// The layout table indexed by the per-monitor layout slots
    pub layouts: Vec<Layout>,
    /// Rules applied to newly managed clients
    pub rules: Vec<Rule>,
    /// Pixel metrics for classifying bar clicks
    pub bar_metrics: BarMetrics,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tags: (1..=9).map(|n| n.to_string()).collect(),
            mfact: 0.55,
            nmaster: 1,
            border_width: 1,
            snap: 32,
            show_bar: true,
            top_bar: true,
            bar_height: 20,
            normal_border: Color::new_from_hex(0x444444),
            focused_border: Color::new_from_hex(0x005577),
            urgent_border: Color::new_from_hex(0xff0000),
            layouts: layout::default_layouts(),
            rules: Vec::new(),
            bar_metrics: BarMetrics::default(),
        }
    }
}

impl Config {
    /// Check that this config can actually be run.
    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "at least one tag is required".to_owned(),
            });
        }

        if self.tags.len() > MAX_TAGS {
            return Err(Error::InvalidConfig {
                reason: format!("at most {MAX_TAGS} tags are supported, got {}", self.tags.len()),
            });
        }

        if !(0.05..=0.95).contains(&self.mfact) {
            return Err(Error::InvalidConfig {
                reason: format!("mfact must be in [0.05, 0.95], got {}", self.mfact),
            });
        }

        if self.layouts.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "at least one layout is required".to_owned(),
            });
        }

        Ok(())
    }

    /// The bitmask covering every configured tag.
    pub fn tag_mask(&self) -> u32 {
        (1 << self.tags.len()) - 1
    }
}

/// Mutable internal state for the window manager.
#[derive(Debug)]
pub struct State {
    /// The user provided configuration
    pub config: Config,
    /// All known monitors in enumeration order
    pub monitors: Vec<Monitor>,
    /// All managed clients keyed by window id
    pub clients: HashMap<Xid, Client>,
    /// The monitor receiving command input
    pub sel_mon: usize,
    /// The full X screen extent
    pub screen: Rect,
    /// The root window status text
    pub status_text: String,
    /// Modifier bit currently assigned to Num_Lock
    pub numlock_mask: u16,
    /// Key chords to grab (kept for re-grabbing on mapping changes)
    pub(crate) key_specs: Vec<KeySpec>,
    /// Button chords to grab on clients
    pub(crate) button_specs: Vec<ButtonSpec>,
    /// The EWMH supporting check window
    pub(crate) check_win: Xid,
    /// Monitor the pointer was last seen on (root motion tracking)
    pub(crate) motion_mon: Option<usize>,
    /// Cleared by `quit` to end the main event loop
    pub running: bool,
}

impl State {
    fn new(config: Config) -> Self {
        Self {
            config,
            monitors: Vec::new(),
            clients: HashMap::new(),
            sel_mon: 0,
            screen: Rect::default(),
            status_text: String::new(),
            numlock_mask: 0,
            key_specs: Vec::new(),
            button_specs: Vec::new(),
            check_win: Xid(0),
            motion_mon: None,
            running: true,
        }
    }

    /// The client currently selected on the focused monitor.
    pub fn selected(&self) -> Option<Xid> {
        self.monitors[self.sel_mon].sel
    }

    /// The monitor currently receiving command input.
    pub fn sel_monitor(&self) -> &Monitor {
        &self.monitors[self.sel_mon]
    }

    /// Whether `id` is shown under its monitor's current view.
    pub fn is_visible_client(&self, id: Xid) -> bool {
        match self.clients.get(&id) {
            Some(c) => c.is_visible(self.monitors[c.mon].view()),
            None => false,
        }
    }

    /// The visible, non-floating clients of monitor `m` in arrangement order.
    pub fn visible_tiled(&self, m: usize) -> Vec<Xid> {
        let view = self.monitors[m].view();

        self.monitors[m]
            .clients
            .iter()
            .copied()
            .filter(|id| {
                let c = &self.clients[id];
                c.is_visible(view) && !c.is_floating()
            })
            .collect()
    }

    /// How many clients (tiled or floating) are visible on monitor `m`.
    pub fn visible_count(&self, m: usize) -> usize {
        let view = self.monitors[m].view();

        self.monitors[m]
            .clients
            .iter()
            .filter(|id| self.clients[id].is_visible(view))
            .count()
    }

    /// Remove `id` from its monitor's focus history, advancing the selection
    /// to the next visible client if `id` was selected.
    pub(crate) fn detach_stack(&mut self, id: Xid) {
        let Some(c) = self.clients.get(&id) else {
            return;
        };
        let mon = c.mon;

        let Self { monitors, clients, .. } = self;
        let view = monitors[mon].view();
        monitors[mon].detach_stack(id, |cid| {
            clients.get(&cid).map(|c| c.is_visible(view)).unwrap_or(false)
        });
    }

    /// The monitor owning the given bar window, if any.
    pub(crate) fn bar_mon(&self, id: Xid) -> Option<usize> {
        self.monitors.iter().find(|m| m.bar_win == id).map(|m| m.num)
    }

    /// The monitor a window belongs to: its client's monitor, its bar's
    /// monitor, or the monitor under the given fallback point.
    pub(crate) fn win_to_mon(&self, id: Xid, fallback: Point) -> usize {
        if let Some(c) = self.clients.get(&id) {
            return c.mon;
        }
        if let Some(m) = self.bar_mon(id) {
            return m;
        }

        rect_to_mon(
            &self.monitors,
            self.sel_mon,
            Rect::new(fallback.x, fallback.y, 1, 1),
        )
    }
}

// Child processes spawned from bindings are reaped as they exit so that no
// zombies accumulate.
extern "C" fn reap_children(_: i32) {
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => (),
        }
    }
}

fn install_sigchld_handler() -> Result<()> {
    // SAFETY: the handler only calls the async-signal-safe waitpid
    unsafe { signal(Signal::SIGCHLD, SigHandler::Handler(reap_children)) }
        .map_err(|e| std::io::Error::from(e))?;

    Ok(())
}

/// The top level window manager: an [XConn], the mutable [State] and the
/// user's bindings.
pub struct WindowManager<X>
where
    X: XConn,
{
    pub(crate) x: X,
    /// The mutable window manager state
    pub state: State,
    key_bindings: Vec<KeyBinding<X>>,
    button_bindings: Vec<ButtonBinding<X>>,
}

impl<X> std::fmt::Debug for WindowManager<X>
where
    X: XConn,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("state", &self.state)
            .finish()
    }
}

impl<X> WindowManager<X>
where
    X: XConn,
{
    /// Construct a new [WindowManager] with the given config and bindings.
    ///
    /// # Errors
    /// Fails if the config does not pass [Config::validate].
    pub fn new(
        x: X,
        config: Config,
        key_bindings: Vec<KeyBinding<X>>,
        button_bindings: Vec<ButtonBinding<X>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut state = State::new(config);
        state.key_specs = key_bindings.iter().map(|b| b.spec).collect();
        state.button_specs = button_bindings.iter().map(|b| b.spec).collect();

        Ok(Self {
            x,
            state,
            key_bindings,
            button_bindings,
        })
    }

    /// Register as the window manager, bring X state in line with our own,
    /// adopt existing windows and run the event loop until `quit`.
    pub fn run(&mut self) -> Result<()> {
        info!("registering as the window manager");
        self.x.become_wm()?;
        self.setup()?;
        self.scan()?;

        info!("entering the main event loop");
        self.x.sync()?;
        while self.state.running {
            let event = self.x.next_event()?;
            trace!(?event, "got event from the X server");
            self.handle_xevent(event);
            self.x.flush();
        }

        self.cleanup()
    }

    pub(crate) fn handle_xevent(&mut self, event: crate::x::XEvent) {
        if let Err(e) = handle::handle_xevent(self, event) {
            error!(%e, "error handling event");
        }
    }

    fn setup(&mut self) -> Result<()> {
        let Self { x, state, .. } = self;

        install_sigchld_handler()?;

        state.screen = x.screen_rect();
        state.numlock_mask = x.numlock_mask()?;
        update_geometry(state, x)?;
        update_bars(state, x)?;
        update_status(state, x)?;

        // Announce EWMH support through a dedicated check window
        let root = x.root();
        let check = x.create_window(Rect::new(0, 0, 1, 1))?;
        state.check_win = check;
        x.replace_prop(check, Atom::NetSupportingWmCheck, PropVal::Window(&[check]))?;
        x.replace_prop(check, Atom::NetWmName, PropVal::Str("escher"))?;
        x.replace_prop(root, Atom::NetSupportingWmCheck, PropVal::Window(&[check]))?;

        let supported: Vec<Xid> = crate::x::EWMH_SUPPORTED_ATOMS
            .iter()
            .map(|&a| x.atom_id(a))
            .collect();
        x.replace_prop(root, Atom::NetSupported, PropVal::Atom(&supported))?;
        x.delete_prop(root, Atom::NetClientList)?;

        x.set_client_attributes(root, &[ClientAttr::RootEventMask])?;
        x.grab_keys(&state.key_specs, state.numlock_mask)?;
        focus(state, x, None)?;

        Ok(())
    }

    // Adopt windows that were mapped before we started: regular windows
    // first so that transients can attach to their parents.
    fn scan(&mut self) -> Result<()> {
        let Self { x, state, .. } = self;
        let windows = x.query_tree()?;
        debug!(n = windows.len(), "scanning existing windows");

        let mut attrs = Vec::with_capacity(windows.len());
        for &id in &windows {
            let Ok(wa) = x.get_window_attributes(id) else {
                continue;
            };
            if wa.override_redirect {
                continue;
            }
            attrs.push((id, wa));
        }

        for &(id, wa) in &attrs {
            if x.get_window_prop(id, Atom::WmTransientFor)?.is_some() {
                continue;
            }
            if wa.viewable || x.get_wm_state(id)? == Some(WmState::Iconic) {
                manage(state, x, id, wa)?;
            }
        }

        for &(id, wa) in &attrs {
            if x.get_window_prop(id, Atom::WmTransientFor)?.is_none() {
                continue;
            }
            if !state.clients.contains_key(&id)
                && (wa.viewable || x.get_wm_state(id)? == Some(WmState::Iconic))
            {
                manage(state, x, id, wa)?;
            }
        }

        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        info!("shutting down");
        let Self { x, state, .. } = self;

        // Reveal everything before handing the clients back
        for m in state.monitors.iter_mut() {
            m.tagset[m.sel_tags] = state.config.tag_mask();
        }
        arrange(state, x, None)?;

        let ids: Vec<Xid> = state.clients.keys().copied().collect();
        for id in ids {
            unmanage(state, x, id, false)?;
        }

        x.grab_keys(&[], 0)?;
        for m in &state.monitors {
            x.destroy_window(m.bar_win)?;
        }
        x.destroy_window(state.check_win)?;
        x.set_input_focus(x.root())?;
        x.delete_prop(x.root(), Atom::NetActiveWindow)?;
        x.sync()?;

        Ok(())
    }
}

/// Select `c` (or the best visible candidate) as the focused client.
///
/// A `None` or invisible `c` falls back to the most recently focused visible
/// client on the selected monitor.
pub(crate) fn focus<X: XConn>(state: &mut State, x: &X, c: Option<Xid>) -> Result<()> {
    let mut target = c.filter(|&id| state.is_visible_client(id));
    if target.is_none() {
        target = state.monitors[state.sel_mon]
            .stack
            .iter()
            .copied()
            .find(|&id| state.is_visible_client(id));
    }

    let prev = state.monitors[state.sel_mon].sel;
    if prev.is_some() && prev != target {
        unfocus(state, x, prev.unwrap(), false)?;
    }

    match target {
        Some(id) => {
            trace!(%id, "focusing client");
            let mon = state.clients[&id].mon;
            state.sel_mon = mon;

            if state.clients[&id].flags.contains(ClientFlags::URGENT) {
                set_urgent(state, x, id, false)?;
            }

            // move to the front of the focus history
            let m = &mut state.monitors[mon];
            m.stack.retain(|&i| i != id);
            m.stack.insert(0, id);
            m.sel = Some(id);

            x.grab_buttons(id, &state.button_specs, true, state.numlock_mask)?;
            x.set_client_border_color(id, state.config.focused_border)?;
            set_input_focus(state, x, id)?;
        }
        None => {
            trace!("no visible client to focus");
            x.set_input_focus(x.root())?;
            x.delete_prop(x.root(), Atom::NetActiveWindow)?;
            state.monitors[state.sel_mon].sel = None;
        }
    }

    Ok(())
}

/// Drop `id` from being the focused client, repainting its border and
/// optionally reverting input focus to the root window.
pub(crate) fn unfocus<X: XConn>(state: &State, x: &X, id: Xid, set_focus_root: bool) -> Result<()> {
    if !state.clients.contains_key(&id) {
        return Ok(());
    }

    x.grab_buttons(id, &state.button_specs, false, state.numlock_mask)?;
    x.set_client_border_color(id, state.config.normal_border)?;

    if set_focus_root {
        x.set_input_focus(x.root())?;
        x.delete_prop(x.root(), Atom::NetActiveWindow)?;
    }

    Ok(())
}

// Hand the X input focus to `id` honoring never-focus clients, and offer
// WM_TAKE_FOCUS to clients that speak it.
pub(crate) fn set_input_focus<X: XConn>(state: &State, x: &X, id: Xid) -> Result<()> {
    let c = &state.clients[&id];

    if !c.flags.contains(ClientFlags::NEVER_FOCUS) {
        x.set_input_focus(id)?;
        x.replace_prop(x.root(), Atom::NetActiveWindow, PropVal::Window(&[id]))?;
    }
    if x.supports_protocol(id, Atom::WmTakeFocus)? {
        x.send_protocol_message(id, Atom::WmTakeFocus)?;
    }

    Ok(())
}

/// Update the urgency state of a client in both our flags and its WM_HINTS.
pub(crate) fn set_urgent<X: XConn>(state: &mut State, x: &X, id: Xid, urgent: bool) -> Result<()> {
    let Some(c) = state.clients.get_mut(&id) else {
        return Ok(());
    };
    c.flags.set(ClientFlags::URGENT, urgent);

    if let Some(mut hints) = x.get_wm_hints(id)? {
        hints.urgent = urgent;
        x.set_wm_hints(id, hints)?;
    }
    if urgent {
        x.set_client_border_color(id, state.config.urgent_border)?;
    }

    Ok(())
}

/// Re-apply the stacking order for monitor `m`: bar on top of tiled clients,
/// the selected floating client above everything.
pub(crate) fn restack<X: XConn>(state: &State, x: &X, m: usize) -> Result<()> {
    let mon = &state.monitors[m];
    let Some(sel) = mon.sel else {
        return Ok(());
    };

    let floating_layout = state.config.layouts[mon.lt[mon.sel_lt]].arrange.is_none();

    x.set_client_config(mon.bar_win, &[ClientConfig::StackTop])?;
    if state.clients[&sel].is_floating() || floating_layout {
        x.set_client_config(sel, &[ClientConfig::StackTop])?;
    }

    if !floating_layout {
        // Stack tiled clients below the bar in focus order, chaining sibling
        // hints so the server never repaints an intermediate order
        let mut sibling = mon.bar_win;
        for &id in &mon.stack {
            let c = &state.clients[&id];
            if !c.is_floating() && c.is_visible(mon.view()) {
                x.set_client_config(id, &[ClientConfig::StackBelow(sibling)])?;
                sibling = id;
            }
        }
    }

    x.sync()?;
    x.drain_crossing_events();

    Ok(())
}

/// Re-run layouts and visibility for one monitor (restacking it) or for all
/// monitors.
pub(crate) fn arrange<X: XConn>(state: &mut State, x: &X, target: Option<usize>) -> Result<()> {
    let mons: Vec<usize> = match target {
        Some(m) => vec![m],
        None => (0..state.monitors.len()).collect(),
    };

    for m in &mons {
        show_hide(state, x, *m)?;
        arrange_monitor(state, x, *m)?;
    }
    if let Some(m) = target {
        restack(state, x, m)?;
    }

    Ok(())
}

// Slide visible clients to their on screen positions and park hidden ones
// offscreen, in stack order so the uncovered windows repaint top-down.
fn show_hide<X: XConn>(state: &mut State, x: &X, m: usize) -> Result<()> {
    let ids: Vec<Xid> = state.monitors[m].stack.clone();
    let view = state.monitors[m].view();
    let floating_layout =
        state.config.layouts[state.monitors[m].lt[state.monitors[m].sel_lt]].arrange.is_none();

    for &id in &ids {
        let c = &state.clients[&id];
        let geom = c.geom;
        if c.is_visible(view) {
            x.position_window(id, Point::new(geom.x, geom.y))?;
            if (floating_layout || c.is_floating()) && !c.is_fullscreen() {
                resize(state, x, id, geom, false)?;
            }
        }
    }

    for &id in ids.iter().rev() {
        let c = &state.clients[&id];
        if !c.is_visible(view) {
            x.position_window(id, Point::new(-2 * c.total_w() as i32, c.geom.y))?;
        }
    }

    Ok(())
}

fn arrange_monitor<X: XConn>(state: &mut State, x: &X, m: usize) -> Result<()> {
    let lt = state.config.layouts[state.monitors[m].lt[state.monitors[m].sel_lt]];
    state.monitors[m].ltsymbol = lt.symbol.to_string();

    let Some(arrange_fn) = lt.arrange else {
        return Ok(());
    };

    let tiled_ids = state.visible_tiled(m);
    let n_visible = state.visible_count(m);

    let positions = {
        let State { monitors, clients, .. } = &*state;
        let tiled: Vec<&Client> = tiled_ids.iter().map(|id| &clients[id]).collect();
        let (symbol, positions) = arrange_fn(&monitors[m], &tiled, n_visible);

        if let Some(s) = symbol {
            state.monitors[m].ltsymbol = s;
        }

        positions
    };

    for (id, r) in positions {
        resize(state, x, id, r, false)?;
    }

    Ok(())
}

/// Resize a client after applying position clamping and size hints, issuing
/// X requests only if the geometry actually changed.
pub(crate) fn resize<X: XConn>(state: &mut State, x: &X, id: Xid, r: Rect, interact: bool) -> Result<()> {
    let Some(c) = state.clients.get(&id) else {
        return Ok(());
    };
    let bound = if interact {
        state.screen
    } else {
        state.monitors[c.mon].wrect
    };

    let (applied, changed) = c.apply_size_hints(r, &bound, interact);
    if changed {
        resize_client(state, x, id, applied)?;
    }

    Ok(())
}

// Unconditionally apply a new geometry: configure the window and tell the
// client about its final size. The synthetic ConfigureNotify must follow the
// ConfigureWindow so clients always observe consistent sizes.
pub(crate) fn resize_client<X: XConn>(state: &mut State, x: &X, id: Xid, r: Rect) -> Result<()> {
    let Some(c) = state.clients.get_mut(&id) else {
        return Ok(());
    };
    c.geom = r;
    let bw = c.bw;

    x.set_client_config(id, &[ClientConfig::Position(r), ClientConfig::BorderPx(bw)])?;
    x.send_configure_notify(id, r, bw)?;
    x.flush();

    Ok(())
}

// Preset tags, floating state and monitor for a new client from the
// configured rules. All matching rules apply, in order.
fn apply_rules<X: XConn>(state: &State, x: &X, c: &mut Client) -> Result<()> {
    c.flags.remove(ClientFlags::FLOATING);
    c.tags = 0;

    let class = x.get_wm_class(c.id)?.unwrap_or_default();

    for r in &state.config.rules {
        let matches = r.title.as_deref().map_or(true, |t| c.name.contains(t))
            && r.class.as_deref().map_or(true, |cl| class.class.contains(cl))
            && r.instance.as_deref().map_or(true, |i| class.instance.contains(i));

        if matches {
            c.flags.set(ClientFlags::FLOATING, r.is_floating);
            c.tags |= r.tags;
            if let Some(m) = r.monitor {
                if m < state.monitors.len() {
                    c.mon = m;
                }
            }
        }
    }

    let masked = c.tags & state.config.tag_mask();
    c.tags = if masked != 0 {
        masked
    } else {
        state.monitors[c.mon].view()
    };

    Ok(())
}

/// Bring a new top-level window under management.
pub(crate) fn manage<X: XConn>(state: &mut State, x: &X, id: Xid, wa: WindowAttributes) -> Result<()> {
    if state.clients.contains_key(&id) {
        return Ok(());
    }
    debug!(%id, "managing new client");

    let mut c = Client::new(id, wa.geom, wa.border_width, state.sel_mon);
    c.name = read_title(x, id)?;

    let trans = x
        .get_window_prop(id, Atom::WmTransientFor)?
        .filter(|t| state.clients.contains_key(t));
    match trans.map(|t| &state.clients[&t]) {
        Some(parent) => {
            c.mon = parent.mon;
            c.tags = parent.tags;
        }
        None => apply_rules(state, x, &mut c)?,
    }

    // Keep the initial geometry inside the window area of its monitor
    let wr = state.monitors[c.mon].wrect;
    if c.geom.x + c.total_w() as i32 > wr.right() {
        c.geom.x = wr.right() - c.total_w() as i32;
    }
    if c.geom.y + c.total_h() as i32 > wr.bottom() {
        c.geom.y = wr.bottom() - c.total_h() as i32;
    }
    c.geom.x = std::cmp::max(c.geom.x, wr.x);
    c.geom.y = std::cmp::max(c.geom.y, wr.y);
    c.bw = state.config.border_width;
    c.old_geom = c.geom;

    let mon = c.mon;
    let geom = c.geom;
    let bw = c.bw;
    state.clients.insert(id, c);

    x.set_client_config(id, &[ClientConfig::BorderPx(bw)])?;
    x.set_client_border_color(id, state.config.normal_border)?;
    x.send_configure_notify(id, geom, bw)?;

    update_window_type(state, x, id)?;
    update_size_hints(state, x, id)?;
    update_wm_hints(state, x, id)?;
    x.set_client_attributes(id, &[ClientAttr::ClientEventMask])?;
    x.grab_buttons(id, &state.button_specs, false, state.numlock_mask)?;

    {
        let c = state.clients.get_mut(&id).expect("just inserted");
        if !c.is_floating() {
            let should_float = trans.is_some() || c.flags.contains(ClientFlags::FIXED);
            c.flags.set(ClientFlags::FLOATING, should_float);
            c.flags.set(ClientFlags::WAS_FLOATING, should_float);
        }
        if c.is_floating() {
            x.set_client_config(id, &[ClientConfig::StackTop])?;
        }
    }

    state.monitors[mon].attach(id);
    state.monitors[mon].attach_stack(id);
    x.append_window_prop(x.root(), Atom::NetClientList, id)?;

    // Park the window offscreen until the arrange below settles where it
    // actually belongs
    let sw = state.screen.w as i32;
    x.position_window(id, Point::new(geom.x + 2 * sw, geom.y))?;
    x.set_wm_state(id, WmState::Normal)?;

    if mon == state.sel_mon {
        if let Some(prev) = state.monitors[mon].sel {
            unfocus(state, x, prev, false)?;
        }
    }
    state.monitors[mon].sel = Some(id);
    arrange(state, x, Some(mon))?;
    x.map_window(id)?;
    focus(state, x, None)?;

    Ok(())
}

/// Drop a client from management, either because its window was destroyed or
/// because it asked to be withdrawn.
pub(crate) fn unmanage<X: XConn>(state: &mut State, x: &X, id: Xid, destroyed: bool) -> Result<()> {
    let Some(c) = state.clients.get(&id) else {
        return Ok(());
    };
    debug!(%id, destroyed, "removing client from management");
    let mon = c.mon;
    let old_bw = c.old_bw;

    state.monitors[mon].detach(id);
    state.detach_stack(id);
    state.clients.remove(&id);

    if !destroyed {
        // The window may be half dead already: failures here are the benign
        // race the error allowlist exists for
        x.set_client_config(id, &[ClientConfig::BorderPx(old_bw)])?;
        x.ungrab_buttons(id)?;
        x.set_wm_state(id, WmState::Withdrawn)?;
        x.sync()?;
    }

    focus(state, x, None)?;
    update_client_list(state, x)?;
    arrange(state, x, Some(mon))?;

    Ok(())
}

/// Move a client to another monitor, retagging it to that monitor's view.
pub(crate) fn send_mon<X: XConn>(state: &mut State, x: &X, id: Xid, target: usize) -> Result<()> {
    let Some(c) = state.clients.get(&id) else {
        return Ok(());
    };
    if c.mon == target || target >= state.monitors.len() {
        return Ok(());
    }

    unfocus(state, x, id, true)?;
    let mon = c.mon;
    state.monitors[mon].detach(id);
    state.detach_stack(id);

    let c = state.clients.get_mut(&id).expect("checked above");
    c.mon = target;
    c.tags = state.monitors[target].view();

    state.monitors[target].attach(id);
    state.monitors[target].attach_stack(id);

    focus(state, x, None)?;
    arrange(state, x, None)?;

    Ok(())
}

/// The monitor index `dir` steps away from the selected monitor, wrapping.
pub(crate) fn dir_to_mon(state: &State, dir: i32) -> usize {
    let n = state.monitors.len();

    if dir > 0 {
        (state.sel_mon + 1) % n
    } else {
        (state.sel_mon + n - 1) % n
    }
}

/// Enter or exit fullscreen for a client, saving and restoring its geometry,
/// border and floating state.
pub(crate) fn set_fullscreen<X: XConn>(state: &mut State, x: &X, id: Xid, fullscreen: bool) -> Result<()> {
    let Some(c) = state.clients.get_mut(&id) else {
        return Ok(());
    };
    let mon = c.mon;

    if fullscreen && !c.is_fullscreen() {
        let fs = x.atom_id(Atom::NetWmStateFullscreen);
        x.replace_prop(id, Atom::NetWmState, PropVal::Atom(&[fs]))?;

        let c = state.clients.get_mut(&id).expect("checked above");
        c.flags.insert(ClientFlags::FULLSCREEN);
        c.flags.set(ClientFlags::WAS_FLOATING, c.is_floating());
        c.flags.insert(ClientFlags::FLOATING);
        c.old_bw = c.bw;
        c.bw = 0;
        c.old_geom = c.geom;

        let mrect = state.monitors[mon].mrect;
        resize_client(state, x, id, mrect)?;
        x.set_client_config(id, &[ClientConfig::StackTop])?;
    } else if !fullscreen && c.is_fullscreen() {
        x.replace_prop(id, Atom::NetWmState, PropVal::Atom(&[]))?;

        let c = state.clients.get_mut(&id).expect("checked above");
        c.flags.remove(ClientFlags::FULLSCREEN);
        let was_floating = c.flags.contains(ClientFlags::WAS_FLOATING);
        c.flags.set(ClientFlags::FLOATING, was_floating);
        c.bw = c.old_bw;
        let restored = c.old_geom;

        resize_client(state, x, id, restored)?;
        arrange(state, x, Some(mon))?;
    }

    Ok(())
}

/// Reconcile the monitor list with the regions currently reported by the
/// server. Returns true if any geometry changed.
pub(crate) fn update_geometry<X: XConn>(state: &mut State, x: &X) -> Result<bool> {
    let mut dirty = false;
    let rects = match x.monitors() {
        Ok(rects) if !rects.is_empty() => rects,
        _ => vec![state.screen],
    };

    // Grow the monitor list for newly connected outputs
    while state.monitors.len() < rects.len() {
        let num = state.monitors.len();
        let Config { mfact, nmaster, show_bar, top_bar, .. } = state.config;
        state.monitors.push(Monitor::new(num, mfact, nmaster, show_bar, top_bar));
        dirty = true;
    }

    // Move clients off disconnected outputs before dropping them
    while state.monitors.len() > rects.len() {
        let dead = state.monitors.len() - 1;
        let ids: Vec<Xid> = state.monitors[dead].clients.clone();
        for id in ids {
            state.monitors[dead].detach(id);
            state.detach_stack(id);
            let c = state.clients.get_mut(&id).expect("tracked client");
            c.mon = 0;
            c.tags = state.monitors[0].view();
            state.monitors[0].attach(id);
            state.monitors[0].attach_stack(id);
        }

        let m = state.monitors.pop().expect("non-empty");
        if *m.bar_win != 0 {
            x.destroy_window(m.bar_win)?;
        }
        if state.sel_mon >= state.monitors.len() {
            state.sel_mon = 0;
        }
        dirty = true;
    }

    for (m, &r) in state.monitors.iter_mut().zip(rects.iter()) {
        if m.mrect != r {
            m.mrect = r;
            m.update_bar_pos(state.config.bar_height);
            dirty = true;
        }
    }

    if dirty {
        state.sel_mon = std::cmp::min(state.sel_mon, state.monitors.len() - 1);
    }

    Ok(dirty)
}

// Create any missing bar windows and position the existing ones.
pub(crate) fn update_bars<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    for m in state.monitors.iter_mut() {
        let r = Rect::new(m.wrect.x, m.by, m.wrect.w, state.config.bar_height);
        if *m.bar_win == 0 {
            m.bar_win = x.create_window(r)?;
            x.map_window(m.bar_win)?;
        } else {
            x.set_client_config(m.bar_win, &[ClientConfig::Position(r)])?;
        }
    }

    Ok(())
}

/// Mirror the root window name into the status text.
pub(crate) fn update_status<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    state.status_text = x
        .get_text_prop(x.root(), Atom::WmName)?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| concat!("escher-", env!("CARGO_PKG_VERSION")).to_string());
    debug!(status = %state.status_text, "updated status text");

    Ok(())
}

/// Rebuild `_NET_CLIENT_LIST` from the per-monitor manage orders.
pub(crate) fn update_client_list<X: XConn>(state: &State, x: &X) -> Result<()> {
    let root = x.root();
    x.delete_prop(root, Atom::NetClientList)?;
    for m in &state.monitors {
        for &id in &m.clients {
            x.append_window_prop(root, Atom::NetClientList, id)?;
        }
    }

    Ok(())
}

// Title with the ICCCM 255 byte clamp and the unreadable-name sentinel.
fn read_title<X: XConn>(x: &X, id: Xid) -> Result<String> {
    let mut name = match x.window_title(id)? {
        Some(name) if !name.is_empty() => name,
        _ => BROKEN.to_string(),
    };

    if name.len() > 255 {
        let mut cut = 255;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }

    Ok(name)
}

/// Re-read the title of a managed client.
pub(crate) fn update_title<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let name = read_title(x, id)?;
    if let Some(c) = state.clients.get_mut(&id) {
        c.name = name;
    }

    Ok(())
}

/// Pick up `_NET_WM_WINDOW_TYPE` and `_NET_WM_STATE` changes: dialogs float,
/// the fullscreen state is entered or left.
pub(crate) fn update_window_type<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let net_state = x.get_atom_prop(id, Atom::NetWmState)?;
    let wtype = x.get_atom_prop(id, Atom::NetWmWindowType)?;

    if net_state == Some(x.atom_id(Atom::NetWmStateFullscreen)) {
        set_fullscreen(state, x, id, true)?;
    }
    if wtype == Some(x.atom_id(Atom::NetWindowTypeDialog)) {
        if let Some(c) = state.clients.get_mut(&id) {
            c.flags.insert(ClientFlags::FLOATING);
        }
    }

    Ok(())
}

/// Re-read WM_NORMAL_HINTS for a client.
pub(crate) fn update_size_hints<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let hints = x.get_normal_hints(id)?;
    if let Some(c) = state.clients.get_mut(&id) {
        c.hints = hints;
        if hints.is_fixed() {
            c.flags.insert(ClientFlags::FIXED | ClientFlags::FLOATING);
        }
    }

    Ok(())
}

/// Re-read WM_HINTS: urgency (cleared in X for the focused client) and the
/// never-focus input hint.
pub(crate) fn update_wm_hints<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let Some(hints) = x.get_wm_hints(id)? else {
        return Ok(());
    };

    let is_selected = state.selected() == Some(id);
    if is_selected && hints.urgent {
        // We already have focus: the hint is stale, clear it for the client
        let mut cleared = hints;
        cleared.urgent = false;
        x.set_wm_hints(id, cleared)?;
    } else if let Some(c) = state.clients.get_mut(&id) {
        c.flags.set(ClientFlags::URGENT, hints.urgent);
        if hints.urgent {
            x.set_client_border_color(id, state.config.urgent_border)?;
        }
    }

    if let Some(c) = state.clients.get_mut(&id) {
        if let Some(accepts) = hints.accepts_input {
            c.flags.set(ClientFlags::NEVER_FOCUS, !accepts);
        } else {
            c.flags.remove(ClientFlags::NEVER_FOCUS);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::x::mock::StubXConn;

    pub(crate) fn stub_state(n_monitors: usize) -> State {
        let mut state = State::new(Config::default());
        state.screen = Rect::new(0, 0, 1000 * n_monitors as u32, 800);
        for n in 0..n_monitors {
            let mut m = Monitor::new(n, 0.55, 1, false, true);
            m.mrect = Rect::new(1000 * n as i32, 0, 1000, 800);
            m.update_bar_pos(20);
            m.bar_win = Xid(900 + n as u32);
            state.monitors.push(m);
        }

        state
    }

    pub(crate) fn add_client(state: &mut State, id: Xid, mon: usize) {
        let mut c = Client::new(id, Rect::new(0, 0, 100, 100), 0, mon);
        c.bw = state.config.border_width;
        c.tags = state.monitors[mon].view();
        state.clients.insert(id, c);
        state.monitors[mon].attach(id);
        state.monitors[mon].attach_stack(id);
        state.monitors[mon].sel = Some(id);
    }

    pub(crate) fn managed_state(ids: &[Xid]) -> (State, StubXConn) {
        let mut state = stub_state(1);
        for &id in ids {
            add_client(&mut state, id, 0);
        }

        (state, StubXConn::default())
    }

    // Invariants from the data model: every client exactly once in each of
    // its monitor's orders, selection visible and stacked.
    pub(crate) fn check_invariants(state: &State) {
        for (id, c) in &state.clients {
            let m = &state.monitors[c.mon];
            assert_eq!(m.clients.iter().filter(|&&i| i == *id).count(), 1, "client order");
            assert_eq!(m.stack.iter().filter(|&&i| i == *id).count(), 1, "stack order");
            assert_eq!(c.tags & !state.config.tag_mask(), 0, "tags inside mask");
        }

        for m in &state.monitors {
            assert_ne!(m.view(), 0, "view is never empty");
            if let Some(sel) = m.sel {
                assert!(m.stack.contains(&sel), "selection is stacked");
                assert!(
                    state.clients[&sel].is_visible(m.view()),
                    "selection is visible"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{test_util::*, *};
    use crate::x::mock::StubXConn;

    #[test]
    fn focus_falls_back_to_the_most_recent_visible_client() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2), Xid(3)]);

        focus(&mut state, &x, None).unwrap();
        assert_eq!(state.selected(), Some(Xid(3)));

        // Hide the front of the stack: focus should skip past it
        state.clients.get_mut(&Xid(3)).unwrap().tags = 1 << 1;
        focus(&mut state, &x, None).unwrap();

        assert_eq!(state.selected(), Some(Xid(2)));
        check_invariants(&state);
    }

    #[test]
    fn focus_moves_the_selected_monitor_with_the_client() {
        let x = StubXConn::default();
        let mut state = stub_state(2);
        add_client(&mut state, Xid(1), 0);
        add_client(&mut state, Xid(2), 1);
        state.sel_mon = 0;

        focus(&mut state, &x, Some(Xid(2))).unwrap();

        assert_eq!(state.sel_mon, 1);
        assert_eq!(state.selected(), Some(Xid(2)));
    }

    #[test]
    fn unmanage_advances_selection_and_rearranges() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2), Xid(3)]);

        unmanage(&mut state, &x, Xid(3), true).unwrap();

        assert!(!state.clients.contains_key(&Xid(3)));
        assert_eq!(state.selected(), Some(Xid(2)));
        assert_eq!(state.monitors[0].clients, vec![Xid(1), Xid(2)]);
        check_invariants(&state);
    }

    #[test]
    fn send_mon_retags_to_the_target_view() {
        let x = StubXConn::default();
        let mut state = stub_state(2);
        add_client(&mut state, Xid(1), 0);
        state.monitors[1].tagset = [1 << 4, 1];

        send_mon(&mut state, &x, Xid(1), 1).unwrap();

        let c = &state.clients[&Xid(1)];
        assert_eq!(c.mon, 1);
        assert_eq!(c.tags, 1 << 4);
        assert!(state.monitors[0].clients.is_empty());
        assert_eq!(state.monitors[1].clients, vec![Xid(1)]);
        check_invariants(&state);
    }

    #[test]
    fn fullscreen_round_trips_geometry_and_border() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        arrange(&mut state, &x, Some(0)).unwrap();
        let tiled_geom = state.clients[&Xid(1)].geom;

        set_fullscreen(&mut state, &x, Xid(1), true).unwrap();
        {
            let c = &state.clients[&Xid(1)];
            assert_eq!(c.geom, state.monitors[0].mrect);
            assert_eq!(c.bw, 0);
            assert!(c.is_fullscreen());
        }

        set_fullscreen(&mut state, &x, Xid(1), false).unwrap();
        {
            let c = &state.clients[&Xid(1)];
            assert_eq!(c.geom, tiled_geom);
            assert_eq!(c.bw, state.config.border_width);
            assert!(!c.is_fullscreen());
            assert!(!c.is_floating());
        }
    }

    #[test]
    fn update_geometry_moves_clients_off_dead_monitors() {
        let x = StubXConn::default();
        let mut state = stub_state(2);
        add_client(&mut state, Xid(1), 1);
        state.monitors[1].tagset = [1 << 2, 1];
        state.clients.get_mut(&Xid(1)).unwrap().tags = 1 << 2;

        // Stub reports a single monitor: monitor 1 is gone
        let dirty = update_geometry(&mut state, &x).unwrap();

        assert!(dirty);
        assert_eq!(state.monitors.len(), 1);
        let c = &state.clients[&Xid(1)];
        assert_eq!(c.mon, 0);
        assert_eq!(c.tags, state.monitors[0].view());
        check_invariants(&state);
    }

    #[test]
    fn config_validation_rejects_too_many_tags() {
        let config = Config {
            tags: (0..32).map(|n| n.to_string()).collect(),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn config_tag_mask_covers_exactly_the_configured_tags() {
        let config = Config::default();

        assert_eq!(config.tags.len(), 9);
        assert_eq!(config.tag_mask(), 0b111111111);
    }
}
