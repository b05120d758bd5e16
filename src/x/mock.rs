//! A mock implementation of XConn that is easier to implement for use in
//! tests. This module and its contents are only available when testing.
use crate::{
    core::bindings::{ButtonSpec, KeySpec},
    pure::{
        client::SizeHints,
        geometry::{Point, Rect},
    },
    x::{
        event::{ClientMessage, ConfigureRequest, XEvent},
        Atom, ClientAttr, ClientConfig, Cursor, PropVal, WindowAttributes, WmClass, WmHints,
        WmState, XConn,
    },
    Error, Result, Xid,
};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};
use strum::IntoEnumIterator;

/// Deterministic fake id for a known [Atom] without a live server.
pub fn mock_atom_id(atom: Atom) -> Xid {
    let index = Atom::iter().position(|a| a == atom).expect("known atom");

    Xid(500 + index as u32)
}

/// Benign default implementations for every [XConn] method, letting tests
/// override only the calls they care about.
///
/// Any implementation of `MockXConn` automatically implements `XConn` by
/// forwarding each `$method` to `mock_$method`. Defaults answer queries with
/// empty / zeroed data and accept all mutations, so state machine logic can
/// run against a stub that records nothing.
#[allow(unused_variables)]
pub trait MockXConn {
    fn mock_root(&self) -> Xid {
        Xid(1)
    }

    fn mock_screen_rect(&self) -> Rect {
        Rect::new(0, 0, 1000, 800)
    }

    fn mock_monitors(&self) -> Result<Vec<Rect>> {
        Ok(vec![self.mock_screen_rect()])
    }

    fn mock_atom_id(&self, atom: Atom) -> Xid {
        mock_atom_id(atom)
    }

    fn mock_become_wm(&self) -> Result<()> {
        Ok(())
    }

    fn mock_next_event(&self) -> Result<XEvent> {
        Err(Error::UnimplementedMock)
    }

    fn mock_flush(&self) {}

    fn mock_sync(&self) -> Result<()> {
        Ok(())
    }

    fn mock_drain_crossing_events(&self) {}

    fn mock_create_window(&self, r: Rect) -> Result<Xid> {
        Err(Error::UnimplementedMock)
    }

    fn mock_destroy_window(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_map_window(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_kill_client(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_query_tree(&self) -> Result<Vec<Xid>> {
        Ok(Vec::new())
    }

    fn mock_query_pointer(&self) -> Result<(Xid, Point)> {
        Ok((self.mock_root(), Point::new(0, 0)))
    }

    fn mock_warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        Ok(())
    }

    fn mock_set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        Ok(())
    }

    fn mock_set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        Ok(())
    }

    fn mock_forward_configure_request(&self, req: &ConfigureRequest) -> Result<()> {
        Ok(())
    }

    fn mock_send_configure_notify(&self, id: Xid, r: Rect, border_width: u32) -> Result<()> {
        Ok(())
    }

    fn mock_position_window(&self, id: Xid, p: Point) -> Result<()> {
        Ok(())
    }

    fn mock_set_input_focus(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_grab_keys(&self, keys: &[KeySpec], numlock_mask: u16) -> Result<()> {
        Ok(())
    }

    fn mock_grab_buttons(
        &self,
        id: Xid,
        buttons: &[ButtonSpec],
        focused: bool,
        numlock_mask: u16,
    ) -> Result<()> {
        Ok(())
    }

    fn mock_ungrab_buttons(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_allow_replay_pointer(&self) -> Result<()> {
        Ok(())
    }

    fn mock_grab_pointer(&self, cursor: Cursor) -> Result<bool> {
        Ok(true)
    }

    fn mock_ungrab_pointer(&self) -> Result<()> {
        Ok(())
    }

    fn mock_numlock_mask(&self) -> Result<u16> {
        Ok(0)
    }

    fn mock_refresh_keymap(&self) -> Result<()> {
        Ok(())
    }

    fn mock_get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        Ok(WindowAttributes {
            geom: Rect::new(0, 0, 100, 100),
            border_width: 0,
            override_redirect: false,
            viewable: false,
        })
    }

    fn mock_get_text_prop(&self, id: Xid, atom: Atom) -> Result<Option<String>> {
        Ok(None)
    }

    fn mock_get_window_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        Ok(None)
    }

    fn mock_get_atom_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        Ok(None)
    }

    fn mock_get_wm_hints(&self, id: Xid) -> Result<Option<WmHints>> {
        Ok(None)
    }

    fn mock_get_normal_hints(&self, id: Xid) -> Result<SizeHints> {
        Ok(SizeHints::default())
    }

    fn mock_get_wm_class(&self, id: Xid) -> Result<Option<WmClass>> {
        Ok(None)
    }

    fn mock_get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        Ok(None)
    }

    fn mock_get_protocols(&self, id: Xid) -> Result<Vec<Xid>> {
        Ok(Vec::new())
    }

    fn mock_set_wm_hints(&self, id: Xid, hints: WmHints) -> Result<()> {
        Ok(())
    }

    fn mock_set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        Ok(())
    }

    fn mock_replace_prop(&self, id: Xid, atom: Atom, val: PropVal<'_>) -> Result<()> {
        Ok(())
    }

    fn mock_append_window_prop(&self, id: Xid, atom: Atom, val: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_delete_prop(&self, id: Xid, atom: Atom) -> Result<()> {
        Ok(())
    }

    fn mock_send_client_message(&self, msg: ClientMessage) -> Result<()> {
        Ok(())
    }
}

impl<T> XConn for T
where
    T: MockXConn,
{
    fn root(&self) -> Xid {
        self.mock_root()
    }

    fn screen_rect(&self) -> Rect {
        self.mock_screen_rect()
    }

    fn monitors(&self) -> Result<Vec<Rect>> {
        self.mock_monitors()
    }

    fn atom_id(&self, atom: Atom) -> Xid {
        self.mock_atom_id(atom)
    }

    fn become_wm(&self) -> Result<()> {
        self.mock_become_wm()
    }

    fn next_event(&self) -> Result<XEvent> {
        self.mock_next_event()
    }

    fn flush(&self) {
        self.mock_flush()
    }

    fn sync(&self) -> Result<()> {
        self.mock_sync()
    }

    fn drain_crossing_events(&self) {
        self.mock_drain_crossing_events()
    }

    fn create_window(&self, r: Rect) -> Result<Xid> {
        self.mock_create_window(r)
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.mock_destroy_window(id)
    }

    fn map_window(&self, id: Xid) -> Result<()> {
        self.mock_map_window(id)
    }

    fn kill_client(&self, id: Xid) -> Result<()> {
        self.mock_kill_client(id)
    }

    fn query_tree(&self) -> Result<Vec<Xid>> {
        self.mock_query_tree()
    }

    fn query_pointer(&self) -> Result<(Xid, Point)> {
        self.mock_query_pointer()
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.mock_warp_pointer(id, x, y)
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        self.mock_set_client_attributes(id, attrs)
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        self.mock_set_client_config(id, data)
    }

    fn forward_configure_request(&self, req: &ConfigureRequest) -> Result<()> {
        self.mock_forward_configure_request(req)
    }

    fn send_configure_notify(&self, id: Xid, r: Rect, border_width: u32) -> Result<()> {
        self.mock_send_configure_notify(id, r, border_width)
    }

    fn position_window(&self, id: Xid, p: Point) -> Result<()> {
        self.mock_position_window(id, p)
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.mock_set_input_focus(id)
    }

    fn grab_keys(&self, keys: &[KeySpec], numlock_mask: u16) -> Result<()> {
        self.mock_grab_keys(keys, numlock_mask)
    }

    fn grab_buttons(
        &self,
        id: Xid,
        buttons: &[ButtonSpec],
        focused: bool,
        numlock_mask: u16,
    ) -> Result<()> {
        self.mock_grab_buttons(id, buttons, focused, numlock_mask)
    }

    fn ungrab_buttons(&self, id: Xid) -> Result<()> {
        self.mock_ungrab_buttons(id)
    }

    fn allow_replay_pointer(&self) -> Result<()> {
        self.mock_allow_replay_pointer()
    }

    fn grab_pointer(&self, cursor: Cursor) -> Result<bool> {
        self.mock_grab_pointer(cursor)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.mock_ungrab_pointer()
    }

    fn numlock_mask(&self) -> Result<u16> {
        self.mock_numlock_mask()
    }

    fn refresh_keymap(&self) -> Result<()> {
        self.mock_refresh_keymap()
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        self.mock_get_window_attributes(id)
    }

    fn get_text_prop(&self, id: Xid, atom: Atom) -> Result<Option<String>> {
        self.mock_get_text_prop(id, atom)
    }

    fn get_window_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        self.mock_get_window_prop(id, atom)
    }

    fn get_atom_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        self.mock_get_atom_prop(id, atom)
    }

    fn get_wm_hints(&self, id: Xid) -> Result<Option<WmHints>> {
        self.mock_get_wm_hints(id)
    }

    fn get_normal_hints(&self, id: Xid) -> Result<SizeHints> {
        self.mock_get_normal_hints(id)
    }

    fn get_wm_class(&self, id: Xid) -> Result<Option<WmClass>> {
        self.mock_get_wm_class(id)
    }

    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        self.mock_get_wm_state(id)
    }

    fn get_protocols(&self, id: Xid) -> Result<Vec<Xid>> {
        self.mock_get_protocols(id)
    }

    fn set_wm_hints(&self, id: Xid, hints: WmHints) -> Result<()> {
        self.mock_set_wm_hints(id, hints)
    }

    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        self.mock_set_wm_state(id, state)
    }

    fn replace_prop(&self, id: Xid, atom: Atom, val: PropVal<'_>) -> Result<()> {
        self.mock_replace_prop(id, atom, val)
    }

    fn append_window_prop(&self, id: Xid, atom: Atom, val: Xid) -> Result<()> {
        self.mock_append_window_prop(id, atom, val)
    }

    fn delete_prop(&self, id: Xid, atom: Atom) -> Result<()> {
        self.mock_delete_prop(id, atom)
    }

    fn send_client_message(&self, msg: ClientMessage) -> Result<()> {
        self.mock_send_client_message(msg)
    }
}

/// A recording stub connection for state machine tests.
///
/// Tracks the windows the state machine reports through `_NET_CLIENT_LIST`
/// plus any scripted window attributes, and hands out fresh window ids for
/// bar / check windows.
#[derive(Debug, Default)]
pub struct StubXConn {
    /// Scripted per-window attributes for manage flows
    pub attrs: RefCell<HashMap<Xid, WindowAttributes>>,
    /// Scripted text properties keyed by (window, atom)
    pub text_props: RefCell<HashMap<(Xid, Atom), String>>,
    /// Scripted `WM_TRANSIENT_FOR` values
    pub transient_for: RefCell<HashMap<Xid, Xid>>,
    /// Scripted protocol lists
    pub protocols: RefCell<HashMap<Xid, Vec<Xid>>>,
    /// The `_NET_CLIENT_LIST` as the server would currently hold it
    pub client_list: RefCell<Vec<Xid>>,
    /// Every configure request passed through to the server verbatim
    pub forwarded: RefCell<Vec<ConfigureRequest>>,
    /// Every client message sent through the connection
    pub sent_messages: RefCell<Vec<ClientMessage>>,
    /// Every window passed to `kill_client`
    pub killed: RefCell<Vec<Xid>>,
    next_id: Cell<u32>,
}

impl MockXConn for StubXConn {
    fn mock_create_window(&self, _r: Rect) -> Result<Xid> {
        let id = 10_000 + self.next_id.get();
        self.next_id.set(self.next_id.get() + 1);

        Ok(Xid(id))
    }

    fn mock_get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        Ok(self
            .attrs
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(WindowAttributes {
                geom: Rect::new(0, 0, 100, 100),
                border_width: 0,
                override_redirect: false,
                viewable: false,
            }))
    }

    fn mock_get_text_prop(&self, id: Xid, atom: Atom) -> Result<Option<String>> {
        Ok(self.text_props.borrow().get(&(id, atom)).cloned())
    }

    fn mock_get_window_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        if atom == Atom::WmTransientFor {
            return Ok(self.transient_for.borrow().get(&id).copied());
        }

        Ok(None)
    }

    fn mock_get_protocols(&self, id: Xid) -> Result<Vec<Xid>> {
        Ok(self.protocols.borrow().get(&id).cloned().unwrap_or_default())
    }

    fn mock_append_window_prop(&self, _id: Xid, atom: Atom, val: Xid) -> Result<()> {
        if atom == Atom::NetClientList {
            self.client_list.borrow_mut().push(val);
        }

        Ok(())
    }

    fn mock_delete_prop(&self, _id: Xid, atom: Atom) -> Result<()> {
        if atom == Atom::NetClientList {
            self.client_list.borrow_mut().clear();
        }

        Ok(())
    }

    fn mock_forward_configure_request(&self, req: &ConfigureRequest) -> Result<()> {
        self.forwarded.borrow_mut().push(*req);

        Ok(())
    }

    fn mock_send_client_message(&self, msg: ClientMessage) -> Result<()> {
        self.sent_messages.borrow_mut().push(msg);

        Ok(())
    }

    fn mock_kill_client(&self, id: Xid) -> Result<()> {
        self.killed.borrow_mut().push(id);

        Ok(())
    }
}
