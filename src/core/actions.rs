//! The actions bound to key and button chords
//!
//! Every action validates its input against the current state and rejects
//! invalid commands in place: no state is modified and no error surfaces
//! beyond the absent effect.
use crate::{
    core::{arrange, dir_to_mon, focus, handle, restack, send_mon, unfocus, State},
    pure::{client::ClientFlags, geometry::Rect, monitor::rect_to_mon},
    util,
    x::{Atom, ClientConfig, Cursor, XConn, XConnExt, XEvent},
    Result,
};
use tracing::debug;

// Drag updates are throttled to roughly 60 events per second.
const DRAG_INTERVAL_MS: u32 = 1000 / 60;

/// Switch the selected monitor to a new view.
///
/// A zero mask flips back to the previously held view.
pub fn view<X: XConn>(state: &mut State, x: &X, mask: u32) -> Result<()> {
    let masked = mask & state.config.tag_mask();
    let m = state.sel_mon;
    if masked == state.monitors[m].view() {
        return Ok(());
    }

    state.monitors[m].flip_view(masked);
    focus(state, x, None)?;
    arrange(state, x, Some(m))
}

/// XOR a tag mask into the current view, rejecting an empty result.
pub fn toggle_view<X: XConn>(state: &mut State, x: &X, mask: u32) -> Result<()> {
    let m = state.sel_mon;
    let new_view = state.monitors[m].view() ^ (mask & state.config.tag_mask());
    if new_view == 0 {
        return Ok(());
    }

    let sel_tags = state.monitors[m].sel_tags;
    state.monitors[m].tagset[sel_tags] = new_view;
    focus(state, x, None)?;
    arrange(state, x, Some(m))
}

/// Reassign the selected client's tags.
pub fn tag<X: XConn>(state: &mut State, x: &X, mask: u32) -> Result<()> {
    let masked = mask & state.config.tag_mask();
    let Some(sel) = state.selected() else {
        return Ok(());
    };
    if masked == 0 {
        return Ok(());
    }

    state.clients.get_mut(&sel).expect("selected is tracked").tags = masked;
    focus(state, x, None)?;
    let m = state.sel_mon;
    arrange(state, x, Some(m))
}

/// XOR a tag mask into the selected client's tags, rejecting an empty result.
pub fn toggle_tag<X: XConn>(state: &mut State, x: &X, mask: u32) -> Result<()> {
    let Some(sel) = state.selected() else {
        return Ok(());
    };

    let new_tags = state.clients[&sel].tags ^ (mask & state.config.tag_mask());
    if new_tags == 0 {
        return Ok(());
    }

    state.clients.get_mut(&sel).expect("selected is tracked").tags = new_tags;
    focus(state, x, None)?;
    let m = state.sel_mon;
    arrange(state, x, Some(m))
}

/// Move the selection along the client order, skipping hidden clients and
/// wrapping at the ends.
pub fn focus_stack<X: XConn>(state: &mut State, x: &X, dir: i32) -> Result<()> {
    let m = state.sel_mon;
    let Some(sel) = state.selected() else {
        return Ok(());
    };

    let order = &state.monitors[m].clients;
    let idx = order.iter().position(|&id| id == sel).expect("selected is attached");

    let next = if dir > 0 {
        order[idx + 1..]
            .iter()
            .chain(order[..idx].iter())
            .copied()
            .find(|&id| state.is_visible_client(id))
    } else {
        order[..idx]
            .iter()
            .rev()
            .chain(order[idx + 1..].iter().rev())
            .copied()
            .find(|&id| state.is_visible_client(id))
    };

    if let Some(id) = next {
        focus(state, x, Some(id))?;
        restack(state, x, state.sel_mon)?;
    }

    Ok(())
}

/// Shift command focus to the next or previous monitor.
pub fn focus_mon<X: XConn>(state: &mut State, x: &X, dir: i32) -> Result<()> {
    if state.monitors.len() <= 1 {
        return Ok(());
    }

    let m = dir_to_mon(state, dir);
    if m == state.sel_mon {
        return Ok(());
    }

    if let Some(sel) = state.selected() {
        unfocus(state, x, sel, false)?;
    }
    state.sel_mon = m;
    focus(state, x, None)
}

/// Move the selected client to the next or previous monitor.
pub fn tag_mon<X: XConn>(state: &mut State, x: &X, dir: i32) -> Result<()> {
    if state.monitors.len() <= 1 {
        return Ok(());
    }
    let Some(sel) = state.selected() else {
        return Ok(());
    };
    let target = dir_to_mon(state, dir);

    send_mon(state, x, sel, target)
}

/// Promote the selected client to the master slot. If it already is the
/// master, promote the next tiled client instead.
pub fn zoom<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let m = state.sel_mon;
    let Some(sel) = state.selected() else {
        return Ok(());
    };

    let mon = &state.monitors[m];
    let floating_layout = state.config.layouts[mon.lt[mon.sel_lt]].arrange.is_none();
    if floating_layout || state.clients[&sel].is_floating() {
        return Ok(());
    }

    let tiled = state.visible_tiled(m);
    let target = if tiled.first() == Some(&sel) {
        match tiled.get(1) {
            Some(&next) => next,
            None => return Ok(()),
        }
    } else {
        sel
    };

    state.monitors[m].pop_to_front(target);
    focus(state, x, Some(target))?;
    arrange(state, x, Some(m))
}

/// Select a layout for the live slot, or toggle between the two slots when
/// no layout is given.
pub fn set_layout<X: XConn>(state: &mut State, x: &X, layout: Option<usize>) -> Result<()> {
    let n_layouts = state.config.layouts.len();
    let m = state.sel_mon;

    match layout {
        None => state.monitors[m].sel_lt ^= 1,
        Some(i) if i < n_layouts => {
            let sel_lt = state.monitors[m].sel_lt;
            state.monitors[m].lt[sel_lt] = i;
        }
        Some(_) => return Ok(()),
    }

    let mon = &mut state.monitors[m];
    mon.ltsymbol = state.config.layouts[mon.lt[mon.sel_lt]].symbol.to_string();

    if state.monitors[m].sel.is_some() {
        arrange(state, x, Some(m))?;
    }

    Ok(())
}

/// Grow or shrink the number of clients tiled into the master column.
pub fn inc_nmaster<X: XConn>(state: &mut State, x: &X, delta: i32) -> Result<()> {
    let m = state.sel_mon;
    let n = state.monitors[m].nmaster as i32 + delta;
    state.monitors[m].nmaster = std::cmp::max(0, n) as u32;

    arrange(state, x, Some(m))
}

/// Adjust the master area fraction: values below 1.0 are relative deltas,
/// values of 1.0 and above set `f - 1.0` absolutely. Results outside
/// `[0.05, 0.95]` are rejected.
pub fn set_mfact<X: XConn>(state: &mut State, x: &X, f: f32) -> Result<()> {
    let m = state.sel_mon;
    let new = if f < 1.0 {
        f + state.monitors[m].mfact
    } else {
        f - 1.0
    };
    if !(0.05..=0.95).contains(&new) {
        return Ok(());
    }

    state.monitors[m].mfact = new;
    arrange(state, x, Some(m))
}

/// Flip the selected client between floating and tiled.
///
/// Moving to floating restores the remembered floating geometry; moving to
/// tiled remembers the current one. Fixed-size clients always float.
pub fn toggle_floating<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let Some(sel) = state.selected() else {
        return Ok(());
    };

    let (restored, now_floating) = {
        let c = state.clients.get_mut(&sel).expect("selected is tracked");
        if c.is_fullscreen() {
            return Ok(());
        }

        let now_floating = !c.is_floating() || c.flags.contains(ClientFlags::FIXED);
        if now_floating {
            c.flags.insert(ClientFlags::FLOATING);
        } else {
            c.flags.remove(ClientFlags::FLOATING);
            c.old_geom = c.geom;
        }

        (c.old_geom, now_floating)
    };

    if now_floating {
        crate::core::resize(state, x, sel, restored, false)?;
    }

    let m = state.sel_mon;
    arrange(state, x, Some(m))
}

/// Show or hide the bar strip on the selected monitor.
pub fn toggle_bar<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let m = state.sel_mon;
    state.monitors[m].show_bar = !state.monitors[m].show_bar;
    state.monitors[m].update_bar_pos(state.config.bar_height);

    let mon = &state.monitors[m];
    let bar_rect = Rect::new(mon.wrect.x, mon.by, mon.wrect.w, state.config.bar_height);
    x.set_client_config(mon.bar_win, &[ClientConfig::Position(bar_rect)])?;

    arrange(state, x, Some(m))
}

/// Politely ask the selected client to close, falling back to severing its
/// connection when it does not speak `WM_DELETE_WINDOW`.
pub fn kill_client<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let Some(sel) = state.selected() else {
        return Ok(());
    };

    if x.supports_protocol(sel, Atom::WmDeleteWindow)? {
        x.send_protocol_message(sel, Atom::WmDeleteWindow)
    } else {
        x.kill_client(sel)
    }
}

/// Run an external command, fully detached from the window manager.
pub fn spawn(argv: &[String]) -> Result<()> {
    util::spawn(argv)
}

/// End the main event loop.
pub fn quit<X: XConn>(state: &mut State, _x: &X) -> Result<()> {
    debug!("quit requested");
    state.running = false;

    Ok(())
}

/// Drag the selected client with the pointer, snapping to the window area
/// edges and tearing tiled clients out into the floating layer.
pub fn move_mouse<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let Some(id) = state.selected() else {
        return Ok(());
    };
    if state.clients[&id].is_fullscreen() {
        return Ok(());
    }
    restack(state, x, state.sel_mon)?;

    let start = state.clients[&id].geom;
    if !x.grab_pointer(Cursor::Move)? {
        return Ok(());
    }
    let (_, p0) = x.query_pointer()?;
    let snap = state.config.snap as i32;
    let mut last_motion = 0u32;

    loop {
        match x.next_event()? {
            XEvent::ConfigureRequest(e) => handle::configure_request(state, x, e)?,
            XEvent::MapRequest(new) => handle::map_request(state, x, new)?,
            XEvent::Motion(e) => {
                if e.time.wrapping_sub(last_motion) <= DRAG_INTERVAL_MS {
                    continue;
                }
                last_motion = e.time;

                let mut nx = start.x + (e.rpt.x - p0.x);
                let mut ny = start.y + (e.rpt.y - p0.y);
                let wr = state.monitors[state.sel_mon].wrect;
                let (geom, tw, th, is_floating) = {
                    let c = &state.clients[&id];
                    (c.geom, c.total_w() as i32, c.total_h() as i32, c.is_floating())
                };

                if (wr.x - nx).abs() < snap {
                    nx = wr.x;
                } else if (wr.right() - (nx + tw)).abs() < snap {
                    nx = wr.right() - tw;
                }
                if (wr.y - ny).abs() < snap {
                    ny = wr.y;
                } else if (wr.bottom() - (ny + th)).abs() < snap {
                    ny = wr.bottom() - th;
                }

                let mon = &state.monitors[state.sel_mon];
                let floating_layout =
                    state.config.layouts[mon.lt[mon.sel_lt]].arrange.is_none();
                if !is_floating
                    && !floating_layout
                    && ((nx - geom.x).abs() > snap || (ny - geom.y).abs() > snap)
                {
                    state
                        .clients
                        .get_mut(&id)
                        .expect("dragged client is tracked")
                        .flags
                        .insert(ClientFlags::FLOATING);
                    let m = state.sel_mon;
                    arrange(state, x, Some(m))?;
                }

                if floating_layout || state.clients[&id].is_floating() {
                    let r = Rect::new(nx, ny, geom.w, geom.h);
                    crate::core::resize(state, x, id, r, true)?;
                }
            }
            XEvent::ButtonRelease(_) => break,
            _ => (),
        }
    }

    x.ungrab_pointer()?;
    drop_into_monitor(state, x, id)
}

/// Resize the selected client with the pointer from its bottom right corner.
pub fn resize_mouse<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let Some(id) = state.selected() else {
        return Ok(());
    };
    if state.clients[&id].is_fullscreen() {
        return Ok(());
    }
    restack(state, x, state.sel_mon)?;

    let (start, bw) = {
        let c = &state.clients[&id];
        (c.geom, c.bw as i32)
    };
    if !x.grab_pointer(Cursor::Resize)? {
        return Ok(());
    }
    x.warp_pointer(
        id,
        (start.w as i32 + bw - 1) as i16,
        (start.h as i32 + bw - 1) as i16,
    )?;
    let snap = state.config.snap as i32;
    let mut last_motion = 0u32;

    loop {
        match x.next_event()? {
            XEvent::ConfigureRequest(e) => handle::configure_request(state, x, e)?,
            XEvent::MapRequest(new) => handle::map_request(state, x, new)?,
            XEvent::Motion(e) => {
                if e.time.wrapping_sub(last_motion) <= DRAG_INTERVAL_MS {
                    continue;
                }
                last_motion = e.time;

                let nw = std::cmp::max(e.rpt.x - start.x - 2 * bw + 1, 1) as u32;
                let nh = std::cmp::max(e.rpt.y - start.y - 2 * bw + 1, 1) as u32;

                let wr = state.monitors[state.sel_mon].wrect;
                let (geom, is_floating) = {
                    let c = &state.clients[&id];
                    (c.geom, c.is_floating())
                };
                let mon = &state.monitors[state.sel_mon];
                let floating_layout =
                    state.config.layouts[mon.lt[mon.sel_lt]].arrange.is_none();

                // Only tear out of the tiled layer while the corner stays
                // inside the window area
                let corner_inside = geom.x + (nw as i32) >= wr.x
                    && geom.x + (nw as i32) <= wr.right()
                    && geom.y + (nh as i32) >= wr.y
                    && geom.y + (nh as i32) <= wr.bottom();
                if corner_inside
                    && !is_floating
                    && !floating_layout
                    && ((nw as i32 - geom.w as i32).abs() > snap
                        || (nh as i32 - geom.h as i32).abs() > snap)
                {
                    state
                        .clients
                        .get_mut(&id)
                        .expect("resized client is tracked")
                        .flags
                        .insert(ClientFlags::FLOATING);
                    let m = state.sel_mon;
                    arrange(state, x, Some(m))?;
                }

                if floating_layout || state.clients[&id].is_floating() {
                    let r = Rect::new(geom.x, geom.y, nw, nh);
                    crate::core::resize(state, x, id, r, true)?;
                }
            }
            XEvent::ButtonRelease(_) => break,
            _ => (),
        }
    }

    let end = state.clients[&id].geom;
    x.warp_pointer(
        id,
        (end.w as i32 + bw - 1) as i16,
        (end.h as i32 + bw - 1) as i16,
    )?;
    x.ungrab_pointer()?;
    x.drain_crossing_events();
    drop_into_monitor(state, x, id)
}

// After a drag the client may have ended up over another monitor.
fn drop_into_monitor<X: XConn>(state: &mut State, x: &X, id: crate::Xid) -> Result<()> {
    let r = state.clients[&id].geom;
    let target = rect_to_mon(&state.monitors, state.sel_mon, r);

    if target != state.sel_mon {
        send_mon(state, x, id, target)?;
        state.sel_mon = target;
        focus(state, x, None)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            test_util::{add_client, check_invariants, managed_state, stub_state},
            update_client_list,
        },
        x::mock::StubXConn,
        Xid,
    };

    #[test]
    fn zoom_promotes_the_selected_client_to_master() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2)]);
        arrange(&mut state, &x, Some(0)).unwrap();
        focus(&mut state, &x, Some(Xid(2))).unwrap();

        zoom(&mut state, &x).unwrap();

        assert_eq!(state.monitors[0].clients, vec![Xid(2), Xid(1)]);
        assert_eq!(state.clients[&Xid(2)].geom, Rect::new(0, 0, 548, 798));
        assert_eq!(state.clients[&Xid(1)].geom, Rect::new(550, 0, 448, 798));
        check_invariants(&state);
    }

    #[test]
    fn zoom_on_the_master_promotes_the_next_tiled_client() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2), Xid(3)]);
        focus(&mut state, &x, Some(Xid(1))).unwrap();

        zoom(&mut state, &x).unwrap();

        assert_eq!(state.monitors[0].clients, vec![Xid(2), Xid(1), Xid(3)]);
        assert_eq!(state.selected(), Some(Xid(2)));
    }

    #[test]
    fn zoom_with_a_single_tiled_client_is_a_noop() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        zoom(&mut state, &x).unwrap();

        assert_eq!(state.monitors[0].clients, vec![Xid(1)]);
    }

    #[test]
    fn tagging_a_client_away_advances_the_selection() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2)]);
        focus(&mut state, &x, Some(Xid(1))).unwrap();

        tag(&mut state, &x, 1 << 2).unwrap();

        assert_eq!(state.clients[&Xid(1)].tags, 0b100);
        assert!(!state.is_visible_client(Xid(1)));
        assert_eq!(state.selected(), Some(Xid(2)));
        check_invariants(&state);
    }

    #[test]
    fn tag_with_an_empty_mask_is_rejected() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        tag(&mut state, &x, 0).unwrap();

        assert_eq!(state.clients[&Xid(1)].tags, 1);
    }

    #[test]
    fn tag_with_no_selection_is_a_noop() {
        let (mut state, x) = managed_state(&[]);

        tag(&mut state, &x, 1 << 1).unwrap();

        check_invariants(&state);
    }

    #[test]
    fn view_switch_preserves_the_arranged_geometry() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2)]);
        arrange(&mut state, &x, Some(0)).unwrap();
        let geoms: Vec<Rect> = [Xid(1), Xid(2)].iter().map(|id| state.clients[id].geom).collect();

        view(&mut state, &x, 1 << 1).unwrap();
        assert_eq!(state.selected(), None);
        view(&mut state, &x, 1 << 0).unwrap();

        let after: Vec<Rect> = [Xid(1), Xid(2)].iter().map(|id| state.clients[id].geom).collect();
        assert_eq!(geoms, after);
        assert_eq!(state.selected(), Some(Xid(2)));
    }

    #[test]
    fn view_zero_flips_to_the_previous_view() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        view(&mut state, &x, 1 << 1).unwrap();
        view(&mut state, &x, 1 << 2).unwrap();
        view(&mut state, &x, 0).unwrap();

        assert_eq!(state.monitors[0].view(), 1 << 1);

        view(&mut state, &x, 0).unwrap();
        assert_eq!(state.monitors[0].view(), 1 << 2);
    }

    #[test]
    fn view_of_the_current_tags_is_a_noop() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        let before = state.monitors[0].tagset;

        view(&mut state, &x, 1).unwrap();

        assert_eq!(state.monitors[0].tagset, before);
    }

    #[test]
    fn toggle_view_rejects_an_empty_view() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        toggle_view(&mut state, &x, 1).unwrap();

        assert_eq!(state.monitors[0].view(), 1);
        check_invariants(&state);
    }

    #[test]
    fn toggle_tag_twice_is_the_identity() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        toggle_tag(&mut state, &x, 1 << 3).unwrap();
        assert_eq!(state.clients[&Xid(1)].tags, 1 | 1 << 3);

        toggle_tag(&mut state, &x, 1 << 3).unwrap();
        assert_eq!(state.clients[&Xid(1)].tags, 1);
    }

    #[test]
    fn toggle_tag_rejects_clearing_the_last_tag() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        toggle_tag(&mut state, &x, 1).unwrap();

        assert_eq!(state.clients[&Xid(1)].tags, 1);
    }

    #[test]
    fn focus_stack_skips_hidden_clients_and_wraps() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2), Xid(3)]);
        state.clients.get_mut(&Xid(2)).unwrap().tags = 1 << 1;
        focus(&mut state, &x, Some(Xid(3))).unwrap();

        focus_stack(&mut state, &x, 1).unwrap();
        assert_eq!(state.selected(), Some(Xid(1)));

        focus_stack(&mut state, &x, -1).unwrap();
        assert_eq!(state.selected(), Some(Xid(3)));
    }

    #[test]
    fn focus_stack_with_one_visible_client_keeps_the_selection() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        focus_stack(&mut state, &x, 1).unwrap();

        assert_eq!(state.selected(), Some(Xid(1)));
    }

    #[test]
    fn inc_nmaster_saturates_at_zero() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        inc_nmaster(&mut state, &x, -5).unwrap();
        assert_eq!(state.monitors[0].nmaster, 0);

        inc_nmaster(&mut state, &x, 2).unwrap();
        assert_eq!(state.monitors[0].nmaster, 2);
    }

    #[test]
    fn set_mfact_applies_relative_and_absolute_values() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        set_mfact(&mut state, &x, 0.05).unwrap();
        assert!((state.monitors[0].mfact - 0.60).abs() < f32::EPSILON);

        set_mfact(&mut state, &x, 1.75).unwrap();
        assert!((state.monitors[0].mfact - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn set_mfact_rejects_out_of_range_results() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        set_mfact(&mut state, &x, 0.5).unwrap();

        assert!((state.monitors[0].mfact - 0.55).abs() < f32::EPSILON);
    }

    #[test]
    fn set_mfact_round_trips_when_unclamped() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        set_mfact(&mut state, &x, 0.1).unwrap();
        set_mfact(&mut state, &x, -0.1).unwrap();

        assert!((state.monitors[0].mfact - 0.55).abs() < f32::EPSILON);
    }

    #[test]
    fn toggle_floating_twice_restores_the_geometry() {
        let (mut state, x) = managed_state(&[Xid(1), Xid(2)]);
        arrange(&mut state, &x, Some(0)).unwrap();
        focus(&mut state, &x, Some(Xid(1))).unwrap();

        toggle_floating(&mut state, &x).unwrap();
        {
            let c = &state.clients[&Xid(1)];
            assert!(c.is_floating());
            assert_eq!(c.geom, Rect::new(0, 0, 100, 100));
        }

        toggle_floating(&mut state, &x).unwrap();
        let c = &state.clients[&Xid(1)];
        assert!(!c.is_floating());
        assert_eq!(c.geom, Rect::new(0, 0, 548, 798));
    }

    #[test]
    fn fixed_clients_stay_floating() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        state
            .clients
            .get_mut(&Xid(1))
            .unwrap()
            .flags
            .insert(ClientFlags::FIXED | ClientFlags::FLOATING);

        toggle_floating(&mut state, &x).unwrap();

        assert!(state.clients[&Xid(1)].is_floating());
    }

    #[test]
    fn toggle_bar_adjusts_the_window_area() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        let mut with_bar = state.monitors[0].clone();
        with_bar.show_bar = true;
        with_bar.update_bar_pos(state.config.bar_height);
        state.monitors[0] = with_bar;
        assert_eq!(state.monitors[0].wrect.h, 780);

        toggle_bar(&mut state, &x).unwrap();

        assert!(!state.monitors[0].show_bar);
        assert_eq!(state.monitors[0].wrect.h, 800);
    }

    #[test]
    fn kill_client_with_no_selection_is_a_noop() {
        let (mut state, x) = managed_state(&[]);

        kill_client(&mut state, &x).unwrap();

        assert!(x.killed.borrow().is_empty());
        assert!(x.sent_messages.borrow().is_empty());
    }

    #[test]
    fn kill_client_prefers_the_delete_protocol() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        x.protocols
            .borrow_mut()
            .insert(Xid(1), vec![crate::x::mock::mock_atom_id(Atom::WmDeleteWindow)]);

        kill_client(&mut state, &x).unwrap();

        assert!(x.killed.borrow().is_empty());
        assert_eq!(x.sent_messages.borrow().len(), 1);
    }

    #[test]
    fn kill_client_falls_back_to_severing_the_connection() {
        let (mut state, x) = managed_state(&[Xid(1)]);

        kill_client(&mut state, &x).unwrap();

        assert_eq!(x.killed.borrow().as_slice(), &[Xid(1)]);
    }

    #[test]
    fn quit_clears_the_running_flag() {
        let (mut state, x) = managed_state(&[]);
        assert!(state.running);

        quit(&mut state, &x).unwrap();

        assert!(!state.running);
    }

    #[test]
    fn focus_mon_wraps_around_the_monitor_list() {
        let x = StubXConn::default();
        let mut state = stub_state(2);
        add_client(&mut state, Xid(1), 0);
        add_client(&mut state, Xid(2), 1);
        state.sel_mon = 1;

        focus_mon(&mut state, &x, 1).unwrap();
        assert_eq!(state.sel_mon, 0);

        focus_mon(&mut state, &x, -1).unwrap();
        assert_eq!(state.sel_mon, 1);
    }

    #[test]
    fn tag_mon_moves_the_selection_to_the_next_monitor() {
        let x = StubXConn::default();
        let mut state = stub_state(2);
        add_client(&mut state, Xid(1), 0);
        state.sel_mon = 0;

        tag_mon(&mut state, &x, 1).unwrap();

        assert_eq!(state.clients[&Xid(1)].mon, 1);
        update_client_list(&state, &x).unwrap();
        assert_eq!(x.client_list.borrow().as_slice(), &[Xid(1)]);
        check_invariants(&state);
    }

    #[test]
    fn set_layout_none_toggles_the_live_slot() {
        let (mut state, x) = managed_state(&[Xid(1)]);
        assert_eq!(state.monitors[0].sel_lt, 0);

        set_layout(&mut state, &x, None).unwrap();
        assert_eq!(state.monitors[0].sel_lt, 1);
        assert_eq!(state.monitors[0].ltsymbol, "><>");

        set_layout(&mut state, &x, Some(2)).unwrap();
        assert_eq!(state.monitors[0].lt[1], 2);
        assert_eq!(state.monitors[0].ltsymbol, "[1]");
    }
}
