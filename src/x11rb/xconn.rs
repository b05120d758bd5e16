//! API wrapper for talking to the X server using x11rb
use crate::{
    core::bindings::{keysym::XK_NUM_LOCK, modifier, ButtonSpec, ClickTarget, KeySpec},
    pure::{
        client::SizeHints,
        geometry::{Point, Rect},
    },
    x::{
        event::{
            ButtonEvent, ClientMessage, ConfigureEvent, ConfigureRequest, ExposeEvent, KeyEvent,
            MotionEvent, PointerChange, PropertyEvent,
        },
        Atom, ClientAttr, ClientConfig, Cursor, PropVal, WindowAttributes, WmClass, WmHints,
        WmState, XConn, XEvent,
    },
    x11rb::{
        conversions::{to_configure_request, to_monitor_rect, to_size_hints, to_wm_hints},
        X11rbError,
    },
    Error, Result, Xid,
};
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
};
use strum::IntoEnumIterator;
use tracing::{error, trace, warn};
use x11rb::{
    connection::Connection,
    errors::ReplyError,
    properties,
    protocol::{
        randr::{self, ConnectionExt as _},
        xproto::{
            Allow, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageEvent,
            ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux,
            EventMask, GetPropertyReply, Grab, GrabMode, GrabStatus, InputFocus, MapState,
            ModMask, NotifyDetail, NotifyMode, PropMode, StackMode, WindowClass,
            CONFIGURE_NOTIFY_EVENT, CONFIGURE_WINDOW_REQUEST, COPY_AREA_REQUEST,
            GRAB_BUTTON_REQUEST, GRAB_KEY_REQUEST, POLY_FILL_RECTANGLE_REQUEST,
            POLY_SEGMENT_REQUEST, POLY_TEXT8_REQUEST, SET_INPUT_FOCUS_REQUEST,
        },
        ErrorKind, Event,
    },
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    x11_utils::X11Error,
    CURRENT_TIME, NONE,
};

fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::BUTTON_PRESS
        | EventMask::POINTER_MOTION
        | EventMask::ENTER_WINDOW
        | EventMask::LEAVE_WINDOW
        | EventMask::STRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
}

fn client_event_mask() -> EventMask {
    EventMask::ENTER_WINDOW
        | EventMask::FOCUS_CHANGE
        | EventMask::PROPERTY_CHANGE
        | EventMask::STRUCTURE_NOTIFY
}

fn button_mask() -> EventMask {
    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE
}

fn mouse_mask() -> EventMask {
    button_mask() | EventMask::POINTER_MOTION
}

// Cursor-font glyphs: left_ptr, fleur, sizing
const GLYPH_NORMAL: u16 = 68;
const GLYPH_MOVE: u16 = 52;
const GLYPH_RESIZE: u16 = 120;

// The benign error allowlist: races between clients vanishing and us acting
// on them. Everything else is logged as a window manager bug.
fn is_benign(err: &X11Error) -> bool {
    match err.error_kind {
        ErrorKind::Window => true,
        ErrorKind::Match => matches!(
            err.major_opcode,
            SET_INPUT_FOCUS_REQUEST | CONFIGURE_WINDOW_REQUEST
        ),
        ErrorKind::Drawable => matches!(
            err.major_opcode,
            POLY_TEXT8_REQUEST | POLY_FILL_RECTANGLE_REQUEST | POLY_SEGMENT_REQUEST
                | COPY_AREA_REQUEST
        ),
        ErrorKind::Access => matches!(err.major_opcode, GRAB_BUTTON_REQUEST | GRAB_KEY_REQUEST),
        _ => false,
    }
}

// The lock modifier combinations every grab is repeated for, so that
// bindings fire regardless of Num lock and Caps lock state.
fn lock_combos(numlock_mask: u16) -> [u16; 4] {
    [
        0,
        modifier::LOCK,
        numlock_mask,
        numlock_mask | modifier::LOCK,
    ]
}

#[derive(Debug)]
struct Keymap {
    first: u8,
    per: u8,
    syms: Vec<u32>,
}

impl Keymap {
    // The unshifted keysym for a keycode, matching how bindings are declared.
    fn keysym(&self, code: u8) -> u32 {
        if code < self.first {
            return 0;
        }

        self.syms
            .get((code - self.first) as usize * self.per as usize)
            .copied()
            .unwrap_or(0)
    }

    fn keycodes_for(&self, keysym: u32) -> Vec<u8> {
        (self.first..=u8::MAX)
            .filter(|&code| self.keysym(code) == keysym)
            .collect()
    }
}

/// Handles communication with an X server via the x11rb crate.
#[derive(Debug)]
pub struct Conn<C: Connection> {
    conn: C,
    root: Xid,
    screen_rect: Rect,
    atoms: HashMap<Atom, u32>,
    cursors: HashMap<Cursor, u32>,
    keymap: RefCell<Keymap>,
    pending: RefCell<VecDeque<Event>>,
    has_randr: bool,
}

/// A production [Conn] over x11rb's [RustConnection].
pub type RustConn = Conn<RustConnection>;

impl RustConn {
    /// Connect to the X server named by `DISPLAY`.
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(X11rbError::from)?;

        Self::new_for_connection(conn, screen_num)
    }
}

impl<C: Connection> Conn<C> {
    /// Wrap an established connection for the given screen.
    pub fn new_for_connection(conn: C, screen_num: usize) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or(X11rbError::NoScreens)?;
        let root = Xid(screen.root);
        let screen_rect = Rect::new(
            0,
            0,
            screen.width_in_pixels as u32,
            screen.height_in_pixels as u32,
        );

        // Send all InternAtom requests before fetching any replies so the
        // whole table costs a single round trip
        let cookies: Vec<_> = Atom::iter()
            .map(|atom| {
                Ok((
                    atom,
                    conn.intern_atom(false, atom.as_ref().as_bytes())
                        .map_err(X11rbError::from)?,
                ))
            })
            .collect::<Result<_>>()?;
        let atoms = cookies
            .into_iter()
            .map(|(atom, cookie)| {
                Ok((atom, cookie.reply().map_err(X11rbError::from)?.atom))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let cursors = Self::make_cursors(&conn)?;
        let keymap = Self::fetch_keymap(&conn)?;

        let has_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .map_err(X11rbError::from)?
            .is_some();
        if has_randr {
            let mask = randr::NotifyMask::SCREEN_CHANGE
                | randr::NotifyMask::CRTC_CHANGE
                | randr::NotifyMask::OUTPUT_CHANGE;
            conn.randr_select_input(*root, mask)
                .map_err(X11rbError::from)?;
        } else {
            warn!("X server has no randr support, running single monitor");
        }

        Ok(Self {
            conn,
            root,
            screen_rect,
            atoms,
            cursors,
            keymap: RefCell::new(keymap),
            pending: RefCell::new(VecDeque::new()),
            has_randr,
        })
    }

    fn make_cursors(conn: &C) -> Result<HashMap<Cursor, u32>> {
        let font = conn.generate_id().map_err(X11rbError::from)?;
        conn.open_font(font, b"cursor").map_err(X11rbError::from)?;

        let mut cursors = HashMap::new();
        for (cursor, glyph) in [
            (Cursor::Normal, GLYPH_NORMAL),
            (Cursor::Move, GLYPH_MOVE),
            (Cursor::Resize, GLYPH_RESIZE),
        ] {
            let id = conn.generate_id().map_err(X11rbError::from)?;
            conn.create_glyph_cursor(id, font, font, glyph, glyph + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)
                .map_err(X11rbError::from)?;
            cursors.insert(cursor, id);
        }

        Ok(cursors)
    }

    fn fetch_keymap(conn: &C) -> Result<Keymap> {
        let setup = conn.setup();
        let (first, last) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(first, last - first + 1)
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        Ok(Keymap {
            first,
            per: reply.keysyms_per_keycode,
            syms: reply.keysyms,
        })
    }

    fn known_atom(&self, atom: Atom) -> u32 {
        *self.atoms.get(&atom).expect("all atoms interned at connect")
    }

    // Tolerate requests against windows that died mid-flight: the property
    // simply reads as unset.
    fn prop_reply(
        &self,
        res: std::result::Result<GetPropertyReply, ReplyError>,
    ) -> Result<Option<GetPropertyReply>> {
        match res {
            Ok(r) => Ok(Some(r)),
            Err(ReplyError::X11Error(_)) => Ok(None),
            Err(ReplyError::ConnectionError(e)) => Err(X11rbError::from(e).into()),
        }
    }

    fn get_prop_raw(&self, id: Xid, atom: u32, ty: AtomEnum) -> Result<Option<GetPropertyReply>> {
        let cookie = self
            .conn
            .get_property(false, *id, atom, ty, 0, 1024)
            .map_err(X11rbError::from)?;

        self.prop_reply(cookie.reply())
    }

    fn convert_event(&self, event: Event) -> Option<XEvent> {
        match event {
            Event::Error(e) => {
                if is_benign(&e) {
                    trace!(?e, "swallowing benign X error");
                } else {
                    error!(
                        error_code = ?e.error_kind,
                        request_code = e.major_opcode,
                        "unexpected X error"
                    );
                }
                None
            }

            Event::ButtonPress(ev) => Some(XEvent::ButtonPress(ButtonEvent {
                id: Xid(ev.event),
                button: ev.detail,
                mask: u16::from(ev.state),
                rpt: Point::new(ev.root_x as i32, ev.root_y as i32),
                wpt: Point::new(ev.event_x as i32, ev.event_y as i32),
            })),

            Event::ButtonRelease(ev) => Some(XEvent::ButtonRelease(ButtonEvent {
                id: Xid(ev.event),
                button: ev.detail,
                mask: u16::from(ev.state),
                rpt: Point::new(ev.root_x as i32, ev.root_y as i32),
                wpt: Point::new(ev.event_x as i32, ev.event_y as i32),
            })),

            Event::ClientMessage(ev) => {
                let data = ev.data.as_data32();
                Some(XEvent::ClientMessage(ClientMessage {
                    id: Xid(ev.window),
                    dtype: Xid(ev.type_),
                    data,
                }))
            }

            Event::ConfigureNotify(ev) => Some(XEvent::ConfigureNotify(ConfigureEvent {
                id: Xid(ev.window),
                r: Rect::new(
                    ev.x as i32,
                    ev.y as i32,
                    ev.width as u32,
                    ev.height as u32,
                ),
                is_root: Xid(ev.window) == self.root,
            })),

            Event::ConfigureRequest(ev) => {
                Some(XEvent::ConfigureRequest(to_configure_request(&ev)))
            }

            Event::DestroyNotify(ev) => Some(XEvent::Destroy(Xid(ev.window))),

            Event::EnterNotify(ev) => Some(XEvent::Enter(PointerChange {
                id: Xid(ev.event),
                rpt: Point::new(ev.root_x as i32, ev.root_y as i32),
                normal_mode: ev.mode == NotifyMode::NORMAL,
                inferior: ev.detail == NotifyDetail::INFERIOR,
            })),

            Event::Expose(ev) => Some(XEvent::Expose(ExposeEvent {
                id: Xid(ev.window),
                count: ev.count as usize,
            })),

            Event::FocusIn(ev) => Some(XEvent::FocusIn(Xid(ev.event))),

            Event::KeyPress(ev) => Some(XEvent::KeyPress(KeyEvent {
                keysym: self.keymap.borrow().keysym(ev.detail),
                mask: u16::from(ev.state),
            })),

            Event::MappingNotify(ev) => Some(XEvent::MappingNotify {
                keyboard: ev.request == x11rb::protocol::xproto::Mapping::KEYBOARD,
            }),

            Event::MapRequest(ev) => Some(XEvent::MapRequest(Xid(ev.window))),

            Event::MotionNotify(ev) => Some(XEvent::Motion(MotionEvent {
                id: Xid(ev.event),
                rpt: Point::new(ev.root_x as i32, ev.root_y as i32),
                time: ev.time,
            })),

            Event::PropertyNotify(ev) => Some(XEvent::PropertyNotify(PropertyEvent {
                id: Xid(ev.window),
                atom: Xid(ev.atom),
                is_root: Xid(ev.window) == self.root,
            })),

            Event::UnmapNotify(ev) => Some(XEvent::UnmapNotify {
                id: Xid(ev.window),
                synthetic: ev.response_type & 0x80 != 0,
            }),

            // Output changes arrive as a root geometry notification so the
            // dispatcher reconciles monitors through one path
            Event::RandrScreenChangeNotify(ev) => Some(XEvent::ConfigureNotify(ConfigureEvent {
                id: self.root,
                r: Rect::new(0, 0, ev.width as u32, ev.height as u32),
                is_root: true,
            })),

            _ => None,
        }
    }
}

impl<C: Connection> XConn for Conn<C> {
    fn root(&self) -> Xid {
        self.root
    }

    fn screen_rect(&self) -> Rect {
        self.screen_rect
    }

    fn monitors(&self) -> Result<Vec<Rect>> {
        if !self.has_randr {
            return Ok(vec![self.screen_rect]);
        }

        let reply = self
            .conn
            .randr_get_monitors(*self.root, true)
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        let mut rects: Vec<Rect> = Vec::with_capacity(reply.monitors.len());
        for m in reply.monitors.iter() {
            let Some(r) = to_monitor_rect(m.x, m.y, m.width, m.height) else {
                continue;
            };
            if !rects.contains(&r) {
                rects.push(r);
            }
        }

        if rects.is_empty() {
            rects.push(self.screen_rect);
        }

        Ok(rects)
    }

    fn atom_id(&self, atom: Atom) -> Xid {
        Xid(self.known_atom(atom))
    }

    fn become_wm(&self) -> Result<()> {
        let aux =
            ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_REDIRECT);
        let res = self
            .conn
            .change_window_attributes(*self.root, &aux)
            .map_err(X11rbError::from)?
            .check();

        match res {
            Ok(()) => Ok(()),
            Err(ReplyError::X11Error(e)) if e.error_kind == ErrorKind::Access => {
                Err(Error::WmAlreadyRunning)
            }
            Err(e) => Err(X11rbError::from(e).into()),
        }
    }

    fn next_event(&self) -> Result<XEvent> {
        loop {
            let event = match self.pending.borrow_mut().pop_front() {
                Some(cached) => cached,
                None => self.conn.wait_for_event().map_err(X11rbError::from)?,
            };

            if let Some(converted) = self.convert_event(event) {
                return Ok(converted);
            }
        }
    }

    fn flush(&self) {
        let _ = self.conn.flush();
    }

    fn sync(&self) -> Result<()> {
        // A round trip forces everything queued to be processed
        self.conn
            .get_input_focus()
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn drain_crossing_events(&self) {
        let mut pending = self.pending.borrow_mut();
        pending.retain(|e| !matches!(e, Event::EnterNotify(_)));

        while let Ok(Some(event)) = self.conn.poll_for_event() {
            if !matches!(event, Event::EnterNotify(_)) {
                pending.push_back(event);
            }
        }
    }

    fn create_window(&self, r: Rect) -> Result<Xid> {
        let id = self.conn.generate_id().map_err(X11rbError::from)?;
        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .event_mask(EventMask::BUTTON_PRESS | EventMask::EXPOSURE);

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                id,
                *self.root,
                r.x as i16,
                r.y as i16,
                r.w as u16,
                r.h as u16,
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .map_err(X11rbError::from)?;

        Ok(Xid(id))
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.conn.destroy_window(*id).map_err(X11rbError::from)?;

        Ok(())
    }

    fn map_window(&self, id: Xid) -> Result<()> {
        self.conn.map_window(*id).map_err(X11rbError::from)?;

        Ok(())
    }

    fn kill_client(&self, id: Xid) -> Result<()> {
        self.conn.kill_client(*id).map_err(X11rbError::from)?;

        Ok(())
    }

    fn query_tree(&self) -> Result<Vec<Xid>> {
        let reply = self
            .conn
            .query_tree(*self.root)
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        Ok(reply.children.into_iter().map(Xid).collect())
    }

    fn query_pointer(&self) -> Result<(Xid, Point)> {
        let reply = self
            .conn
            .query_pointer(*self.root)
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        Ok((
            Xid(reply.child),
            Point::new(reply.root_x as i32, reply.root_y as i32),
        ))
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.conn
            .warp_pointer(NONE, *id, 0, 0, 0, 0, x, y)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        let mut aux = ChangeWindowAttributesAux::new();
        for attr in attrs {
            aux = match attr {
                ClientAttr::BorderColor(rgb) => aux.border_pixel(*rgb),
                ClientAttr::ClientEventMask => aux.event_mask(client_event_mask()),
                ClientAttr::RootEventMask => aux
                    .event_mask(root_event_mask())
                    .cursor(self.cursors[&Cursor::Normal]),
            };
        }

        self.conn
            .change_window_attributes(*id, &aux)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        for conf in data {
            aux = match conf {
                ClientConfig::BorderPx(bw) => aux.border_width(*bw),
                ClientConfig::Position(r) => {
                    aux.x(r.x).y(r.y).width(r.w).height(r.h)
                }
                ClientConfig::StackBelow(sibling) => {
                    aux.sibling(**sibling).stack_mode(StackMode::BELOW)
                }
                ClientConfig::StackTop => aux.stack_mode(StackMode::ABOVE),
            };
        }

        self.conn
            .configure_window(*id, &aux)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn forward_configure_request(&self, req: &ConfigureRequest) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = req.x {
            aux = aux.x(x);
        }
        if let Some(y) = req.y {
            aux = aux.y(y);
        }
        if let Some(w) = req.w {
            aux = aux.width(w);
        }
        if let Some(h) = req.h {
            aux = aux.height(h);
        }
        if let Some(bw) = req.border_width {
            aux = aux.border_width(bw);
        }
        if let Some(sibling) = req.sibling {
            aux = aux.sibling(*sibling);
        }
        if let Some(mode) = req.stack_mode {
            aux = aux.stack_mode(StackMode::from(mode as u8));
        }

        self.conn
            .configure_window(*req.id, &aux)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn send_configure_notify(&self, id: Xid, r: Rect, border_width: u32) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: *id,
            window: *id,
            above_sibling: NONE,
            x: r.x as i16,
            y: r.y as i16,
            width: r.w as u16,
            height: r.h as u16,
            border_width: border_width as u16,
            override_redirect: false,
        };

        self.conn
            .send_event(false, *id, EventMask::STRUCTURE_NOTIFY, event)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn position_window(&self, id: Xid, p: Point) -> Result<()> {
        let aux = ConfigureWindowAux::new().x(p.x).y(p.y);
        self.conn
            .configure_window(*id, &aux)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, *id, CURRENT_TIME)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn grab_keys(&self, keys: &[KeySpec], numlock_mask: u16) -> Result<()> {
        self.conn
            .ungrab_key(Grab::ANY, *self.root, ModMask::ANY)
            .map_err(X11rbError::from)?;

        let keymap = self.keymap.borrow();
        for spec in keys {
            for code in keymap.keycodes_for(spec.keysym) {
                for combo in lock_combos(numlock_mask) {
                    self.conn
                        .grab_key(
                            true,
                            *self.root,
                            ModMask::from(spec.mods | combo),
                            code,
                            GrabMode::ASYNC,
                            GrabMode::ASYNC,
                        )
                        .map_err(X11rbError::from)?;
                }
            }
        }
        self.flush();

        Ok(())
    }

    fn grab_buttons(
        &self,
        id: Xid,
        buttons: &[ButtonSpec],
        focused: bool,
        numlock_mask: u16,
    ) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::ANY, *id, ModMask::ANY)
            .map_err(X11rbError::from)?;

        if !focused {
            // Unfocused clients freeze the pointer on click so the press can
            // be replayed after we shift focus
            self.conn
                .grab_button(
                    false,
                    *id,
                    button_mask(),
                    GrabMode::SYNC,
                    GrabMode::SYNC,
                    NONE,
                    NONE,
                    ButtonIndex::ANY,
                    ModMask::ANY,
                )
                .map_err(X11rbError::from)?;
        }

        for spec in buttons.iter().filter(|b| b.click == ClickTarget::ClientWin) {
            for combo in lock_combos(numlock_mask) {
                self.conn
                    .grab_button(
                        false,
                        *id,
                        button_mask(),
                        GrabMode::ASYNC,
                        GrabMode::SYNC,
                        NONE,
                        NONE,
                        ButtonIndex::from(spec.button),
                        ModMask::from(spec.mods | combo),
                    )
                    .map_err(X11rbError::from)?;
            }
        }

        Ok(())
    }

    fn ungrab_buttons(&self, id: Xid) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::ANY, *id, ModMask::ANY)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn allow_replay_pointer(&self) -> Result<()> {
        self.conn
            .allow_events(Allow::REPLAY_POINTER, CURRENT_TIME)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn grab_pointer(&self, cursor: Cursor) -> Result<bool> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                *self.root,
                mouse_mask(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                self.cursors[&cursor],
                CURRENT_TIME,
            )
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn
            .ungrab_pointer(CURRENT_TIME)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn numlock_mask(&self) -> Result<u16> {
        let reply = self
            .conn
            .get_modifier_mapping()
            .map_err(X11rbError::from)?
            .reply()
            .map_err(X11rbError::from)?;

        let per = reply.keycodes_per_modifier() as usize;
        if per == 0 {
            return Ok(0);
        }
        let keymap = self.keymap.borrow();
        for (i, chunk) in reply.keycodes.chunks(per).enumerate() {
            for &code in chunk {
                if code != 0 && keymap.keysym(code) == XK_NUM_LOCK {
                    return Ok(1 << i);
                }
            }
        }

        Ok(0)
    }

    fn refresh_keymap(&self) -> Result<()> {
        *self.keymap.borrow_mut() = Self::fetch_keymap(&self.conn)?;

        Ok(())
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        let attr_cookie = self
            .conn
            .get_window_attributes(*id)
            .map_err(X11rbError::from)?;
        let geom_cookie = self.conn.get_geometry(*id).map_err(X11rbError::from)?;

        let attrs = attr_cookie.reply().map_err(X11rbError::from)?;
        let geom = geom_cookie.reply().map_err(X11rbError::from)?;

        Ok(WindowAttributes {
            geom: Rect::new(
                geom.x as i32,
                geom.y as i32,
                geom.width as u32,
                geom.height as u32,
            ),
            border_width: geom.border_width as u32,
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
        })
    }

    fn get_text_prop(&self, id: Xid, atom: Atom) -> Result<Option<String>> {
        let Some(reply) = self.get_prop_raw(id, self.known_atom(atom), AtomEnum::ANY)? else {
            return Ok(None);
        };
        if reply.value.is_empty() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&reply.value).to_string()))
    }

    fn get_window_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        let Some(reply) = self.get_prop_raw(id, self.known_atom(atom), AtomEnum::WINDOW)? else {
            return Ok(None);
        };

        Ok(reply.value32().and_then(|mut it| it.next()).map(Xid))
    }

    fn get_atom_prop(&self, id: Xid, atom: Atom) -> Result<Option<Xid>> {
        let Some(reply) = self.get_prop_raw(id, self.known_atom(atom), AtomEnum::ATOM)? else {
            return Ok(None);
        };

        Ok(reply.value32().and_then(|mut it| it.next()).map(Xid))
    }

    fn get_wm_hints(&self, id: Xid) -> Result<Option<WmHints>> {
        let raw = properties::WmHints::get(&self.conn, *id)
            .map_err(X11rbError::from)?
            .reply_unchecked()
            .map_err(X11rbError::from)?;

        Ok(to_wm_hints(raw))
    }

    fn get_normal_hints(&self, id: Xid) -> Result<SizeHints> {
        let raw = properties::WmSizeHints::get_normal_hints(&self.conn, *id)
            .map_err(X11rbError::from)?
            .reply_unchecked()
            .map_err(X11rbError::from)?;

        Ok(to_size_hints(raw))
    }

    fn get_wm_class(&self, id: Xid) -> Result<Option<WmClass>> {
        let raw = properties::WmClass::get(&self.conn, *id)
            .map_err(X11rbError::from)?
            .reply_unchecked()
            .map_err(X11rbError::from)?;

        Ok(raw.map(|c| WmClass {
            instance: String::from_utf8_lossy(c.instance()).to_string(),
            class: String::from_utf8_lossy(c.class()).to_string(),
        }))
    }

    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        let wm_state = self.known_atom(Atom::WmState);
        let Some(reply) = self.get_prop_raw(id, wm_state, AtomEnum::ANY)? else {
            return Ok(None);
        };

        Ok(reply
            .value32()
            .and_then(|mut it| it.next())
            .and_then(|raw| WmState::try_from(raw).ok()))
    }

    fn get_protocols(&self, id: Xid) -> Result<Vec<Xid>> {
        let protocols = self.known_atom(Atom::WmProtocols);
        let Some(reply) = self.get_prop_raw(id, protocols, AtomEnum::ATOM)? else {
            return Ok(Vec::new());
        };

        Ok(reply
            .value32()
            .map(|it| it.map(Xid).collect())
            .unwrap_or_default())
    }

    fn set_wm_hints(&self, id: Xid, hints: WmHints) -> Result<()> {
        crate::x11rb::conversions::from_wm_hints(hints)
            .set(&self.conn, *id)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        let wm_state = self.known_atom(Atom::WmState);
        let data: [u32; 2] = [u32::from(state), NONE];
        self.conn
            .change_property32(PropMode::REPLACE, *id, wm_state, wm_state, &data)
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn replace_prop(&self, id: Xid, atom: Atom, val: PropVal<'_>) -> Result<()> {
        let prop = self.known_atom(atom);
        let res = match val {
            PropVal::Atom(xids) => {
                let data: Vec<u32> = xids.iter().map(|x| **x).collect();
                self.conn
                    .change_property32(PropMode::REPLACE, *id, prop, AtomEnum::ATOM, &data)
            }
            PropVal::Window(xids) => {
                let data: Vec<u32> = xids.iter().map(|x| **x).collect();
                self.conn
                    .change_property32(PropMode::REPLACE, *id, prop, AtomEnum::WINDOW, &data)
            }
            PropVal::Cardinal(vals) => self.conn.change_property32(
                PropMode::REPLACE,
                *id,
                prop,
                AtomEnum::CARDINAL,
                vals,
            ),
            PropVal::Str(s) => self.conn.change_property8(
                PropMode::REPLACE,
                *id,
                prop,
                self.known_atom(Atom::UTF8String),
                s.as_bytes(),
            ),
        };
        res.map_err(X11rbError::from)?;

        Ok(())
    }

    fn append_window_prop(&self, id: Xid, atom: Atom, val: Xid) -> Result<()> {
        self.conn
            .change_property32(
                PropMode::APPEND,
                *id,
                self.known_atom(atom),
                AtomEnum::WINDOW,
                &[*val],
            )
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn delete_prop(&self, id: Xid, atom: Atom) -> Result<()> {
        self.conn
            .delete_property(*id, self.known_atom(atom))
            .map_err(X11rbError::from)?;

        Ok(())
    }

    fn send_client_message(&self, msg: ClientMessage) -> Result<()> {
        let event = ClientMessageEvent::new(32, *msg.id, *msg.dtype, msg.data);
        self.conn
            .send_event(false, *msg.id, EventMask::NO_EVENT, event)
            .map_err(X11rbError::from)?;

        Ok(())
    }
}
