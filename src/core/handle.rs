//! Translating X events into window manager state transitions
//!
//! The dispatcher is a single match over the typed [XEvent] stream: O(1),
//! and silently tolerant of anything a backend chooses not to surface.
use crate::{
    core::{
        arrange, bindings::{clean_mask, ButtonBinding, ClickTarget, KeyBinding},
        focus, manage, resize_client, restack, set_fullscreen, set_input_focus, set_urgent,
        unfocus, unmanage, update_bars, update_geometry, update_size_hints, update_status,
        update_title, update_window_type, update_wm_hints, State, WindowManager,
    },
    pure::{client::ClientFlags, geometry::Rect, monitor::rect_to_mon},
    x::{
        event::{
            ButtonEvent, ClientMessage, ConfigureEvent, ConfigureRequest, ExposeEvent, KeyEvent,
            MotionEvent, PointerChange,
        },
        Atom, WmState, XConn, XEvent,
    },
    Result, Xid,
};
use tracing::{debug, trace};

pub(crate) fn handle_xevent<X: XConn>(wm: &mut WindowManager<X>, event: XEvent) -> Result<()> {
    let WindowManager {
        x,
        state,
        key_bindings,
        button_bindings,
    } = wm;

    match event {
        XEvent::ButtonPress(e) => button_press(state, x, button_bindings, e),
        XEvent::ButtonRelease(_) => Ok(()), // only meaningful inside drag loops
        XEvent::ClientMessage(m) => client_message(state, x, m),
        XEvent::ConfigureNotify(e) => configure_notify(state, x, e),
        XEvent::ConfigureRequest(e) => configure_request(state, x, e),
        XEvent::Destroy(id) => unmanage(state, x, id, true),
        XEvent::Enter(p) => enter_notify(state, x, p),
        XEvent::Expose(e) => expose(state, e),
        XEvent::FocusIn(id) => focus_in(state, x, id),
        XEvent::KeyPress(k) => key_press(state, x, key_bindings, k),
        XEvent::MappingNotify { keyboard } => mapping_notify(state, x, keyboard),
        XEvent::MapRequest(id) => map_request(state, x, id),
        XEvent::Motion(e) => motion_notify(state, x, e),
        XEvent::PropertyNotify(e) => property_notify(state, x, e),
        XEvent::UnmapNotify { id, synthetic } => unmap_notify(state, x, id, synthetic),
    }
}

pub(crate) fn map_request<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let Ok(wa) = x.get_window_attributes(id) else {
        return Ok(());
    };
    if wa.override_redirect || state.clients.contains_key(&id) {
        return Ok(());
    }

    manage(state, x, id, wa)
}

fn unmap_notify<X: XConn>(state: &mut State, x: &X, id: Xid, synthetic: bool) -> Result<()> {
    if !state.clients.contains_key(&id) {
        return Ok(());
    }

    if synthetic {
        // The client is asking to be withdrawn rather than going away
        x.set_wm_state(id, WmState::Withdrawn)
    } else {
        unmanage(state, x, id, false)
    }
}

fn key_press<X: XConn>(
    state: &mut State,
    x: &X,
    bindings: &mut [KeyBinding<X>],
    k: KeyEvent,
) -> Result<()> {
    let pressed = clean_mask(k.mask, state.numlock_mask);

    for b in bindings.iter_mut() {
        if b.spec.keysym == k.keysym && clean_mask(b.spec.mods, state.numlock_mask) == pressed {
            trace!(keysym = k.keysym, "running key binding");
            (b.action)(state, x)?;
        }
    }

    Ok(())
}

fn button_press<X: XConn>(
    state: &mut State,
    x: &X,
    bindings: &mut [ButtonBinding<X>],
    e: ButtonEvent,
) -> Result<()> {
    let mut click = ClickTarget::RootWin;
    let mut click_arg = None;

    let m = state.win_to_mon(e.id, e.rpt);
    if m != state.sel_mon {
        if let Some(prev) = state.monitors[state.sel_mon].sel {
            unfocus(state, x, prev, true)?;
        }
        state.sel_mon = m;
        focus(state, x, None)?;
    }

    if state.bar_mon(e.id) == Some(m) {
        let mon = &state.monitors[m];
        let (target, tag_index) =
            state
                .config
                .bar_metrics
                .click_target(state.config.tags.len(), mon.wrect.w, e.wpt.x);
        click = target;
        click_arg = tag_index.map(|i| 1 << i);
    } else if state.clients.contains_key(&e.id) {
        focus(state, x, Some(e.id))?;
        restack(state, x, state.sel_mon)?;
        x.allow_replay_pointer()?;
        click = ClickTarget::ClientWin;
    }

    let pressed = clean_mask(e.mask, state.numlock_mask);
    for b in bindings.iter_mut() {
        if b.spec.click == click
            && b.spec.button == e.button
            && clean_mask(b.spec.mods, state.numlock_mask) == pressed
        {
            (b.action)(state, x, click_arg)?;
        }
    }

    Ok(())
}

fn client_message<X: XConn>(state: &mut State, x: &X, m: ClientMessage) -> Result<()> {
    let (is_fullscreen, is_urgent) = match state.clients.get(&m.id) {
        Some(c) => (c.is_fullscreen(), c.flags.contains(ClientFlags::URGENT)),
        None => return Ok(()),
    };

    if m.dtype == x.atom_id(Atom::NetWmState) {
        let fullscreen = *x.atom_id(Atom::NetWmStateFullscreen);
        if m.data[1] == fullscreen || m.data[2] == fullscreen {
            // data[0]: 0 = remove, 1 = add, 2 = toggle
            let enable = m.data[0] == 1 || (m.data[0] == 2 && !is_fullscreen);
            set_fullscreen(state, x, m.id, enable)?;
        }
    } else if m.dtype == x.atom_id(Atom::NetActiveWindow) {
        if state.selected() != Some(m.id) && !is_urgent {
            set_urgent(state, x, m.id, true)?;
        }
    }

    Ok(())
}

fn configure_notify<X: XConn>(state: &mut State, x: &X, e: ConfigureEvent) -> Result<()> {
    if !e.is_root {
        return Ok(());
    }

    let dirty = state.screen.w != e.r.w || state.screen.h != e.r.h;
    state.screen.w = e.r.w;
    state.screen.h = e.r.h;

    if update_geometry(state, x)? || dirty {
        debug!("root geometry changed, reconciling monitors");
        update_bars(state, x)?;

        let fullscreen: Vec<(Xid, usize)> = state
            .clients
            .iter()
            .filter(|(_, c)| c.is_fullscreen())
            .map(|(&id, c)| (id, c.mon))
            .collect();
        for (id, mon) in fullscreen {
            let mrect = state.monitors[mon].mrect;
            resize_client(state, x, id, mrect)?;
        }

        focus(state, x, None)?;
        arrange(state, x, None)?;
    }

    Ok(())
}

pub(crate) fn configure_request<X: XConn>(state: &mut State, x: &X, e: ConfigureRequest) -> Result<()> {
    let State {
        clients,
        monitors,
        config,
        ..
    } = state;

    match clients.get_mut(&e.id) {
        Some(c) => {
            let mon = &monitors[c.mon];
            let floating_layout = config.layouts[mon.lt[mon.sel_lt]].arrange.is_none();

            if c.is_floating() || floating_layout {
                // Mirror the masked fields into our record (x/y are root
                // absolute), then pass the request through untouched
                if let Some(bw) = e.border_width {
                    c.bw = bw;
                }
                if let Some(rx) = e.x {
                    c.geom.x = rx;
                }
                if let Some(ry) = e.y {
                    c.geom.y = ry;
                }
                if let Some(w) = e.w {
                    c.geom.w = w;
                }
                if let Some(h) = e.h {
                    c.geom.h = h;
                }
                x.forward_configure_request(&e)?;
            } else {
                // Tiled clients do not get to pick their own geometry, but
                // ICCCM requires telling them where they actually are
                x.send_configure_notify(e.id, c.geom, c.bw)?;
            }
        }
        // Not ours to police: forward exactly what was asked for
        None => x.forward_configure_request(&e)?,
    }

    x.sync()?;

    Ok(())
}

fn enter_notify<X: XConn>(state: &mut State, x: &X, p: PointerChange) -> Result<()> {
    if (!p.normal_mode || p.inferior) && p.id != x.root() {
        return Ok(());
    }

    let c = state.clients.contains_key(&p.id).then_some(p.id);
    let m = state.win_to_mon(p.id, p.rpt);

    if m != state.sel_mon {
        if let Some(prev) = state.monitors[state.sel_mon].sel {
            unfocus(state, x, prev, true)?;
        }
        state.sel_mon = m;
    } else if c.is_none() || c == state.monitors[state.sel_mon].sel {
        return Ok(());
    }

    focus(state, x, c)
}

// Misbehaving clients can steal the input focus: put it back.
fn focus_in<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    match state.selected() {
        Some(sel) if sel != id => set_input_focus(state, x, sel),
        _ => Ok(()),
    }
}

fn motion_notify<X: XConn>(state: &mut State, x: &X, e: MotionEvent) -> Result<()> {
    if e.id != x.root() {
        return Ok(());
    }

    let m = rect_to_mon(
        &state.monitors,
        state.sel_mon,
        Rect::new(e.rpt.x, e.rpt.y, 1, 1),
    );
    if state.motion_mon.is_some_and(|prev| prev != m) {
        if let Some(sel) = state.monitors[state.sel_mon].sel {
            unfocus(state, x, sel, true)?;
        }
        state.sel_mon = m;
        focus(state, x, None)?;
    }
    state.motion_mon = Some(m);

    Ok(())
}

fn expose(state: &State, e: ExposeEvent) -> Result<()> {
    if e.count == 0 {
        if let Some(m) = state.bar_mon(e.id) {
            // Rendering is delegated: the external bar process watches for
            // this
            debug!(monitor = m, "bar exposed");
        }
    }

    Ok(())
}

fn mapping_notify<X: XConn>(state: &mut State, x: &X, keyboard: bool) -> Result<()> {
    x.refresh_keymap()?;
    if keyboard {
        state.numlock_mask = x.numlock_mask()?;
        x.grab_keys(&state.key_specs, state.numlock_mask)?;
    }

    Ok(())
}

fn property_notify<X: XConn>(state: &mut State, x: &X, e: crate::x::event::PropertyEvent) -> Result<()> {
    if e.is_root && e.atom == x.atom_id(Atom::WmName) {
        return update_status(state, x);
    }
    if !state.clients.contains_key(&e.id) {
        return Ok(());
    }

    if e.atom == x.atom_id(Atom::WmTransientFor) {
        transient_update(state, x, e.id)?;
    } else if e.atom == x.atom_id(Atom::WmNormalHints) {
        update_size_hints(state, x, e.id)?;
    } else if e.atom == x.atom_id(Atom::WmHints) {
        update_wm_hints(state, x, e.id)?;
    }

    if e.atom == x.atom_id(Atom::WmName) || e.atom == x.atom_id(Atom::NetWmName) {
        update_title(state, x, e.id)?;
    }
    if e.atom == x.atom_id(Atom::NetWmWindowType) {
        update_window_type(state, x, e.id)?;
    }

    Ok(())
}

// A tiled client becoming transient for a managed window starts floating.
fn transient_update<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    if state.clients[&id].is_floating() {
        return Ok(());
    }

    let parent = x
        .get_window_prop(id, Atom::WmTransientFor)?
        .filter(|t| state.clients.contains_key(t));

    if parent.is_some() {
        let mon = {
            let c = state.clients.get_mut(&id).expect("checked above");
            c.flags.insert(ClientFlags::FLOATING);
            c.mon
        };
        arrange(state, x, Some(mon))?;
    }

    Ok(())
}
