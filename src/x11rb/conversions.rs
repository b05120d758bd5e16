//! Conversions from raw x11rb protocol data into escher's typed equivalents
use crate::{
    pure::{client::SizeHints, geometry::Rect},
    x::event::ConfigureRequest,
    Xid,
};
use x11rb::{
    properties::{WmHints, WmSizeHints},
    protocol::xproto::{ConfigWindow, ConfigureRequestEvent},
};

pub(crate) fn to_configure_request(ev: &ConfigureRequestEvent) -> ConfigureRequest {
    let mask = ev.value_mask;

    ConfigureRequest {
        id: Xid(ev.window),
        x: mask.contains(ConfigWindow::X).then_some(ev.x as i32),
        y: mask.contains(ConfigWindow::Y).then_some(ev.y as i32),
        w: mask.contains(ConfigWindow::WIDTH).then_some(ev.width as u32),
        h: mask.contains(ConfigWindow::HEIGHT).then_some(ev.height as u32),
        border_width: mask
            .contains(ConfigWindow::BORDER_WIDTH)
            .then_some(ev.border_width as u32),
        sibling: mask.contains(ConfigWindow::SIBLING).then_some(Xid(ev.sibling)),
        stack_mode: mask
            .contains(ConfigWindow::STACK_MODE)
            .then_some(u32::from(ev.stack_mode)),
    }
}

// Absent hint fields keep the unset (zero) convention of [SizeHints]; the
// base size falls back to the minimum size and vice versa per ICCCM.
pub(crate) fn to_size_hints(raw: Option<WmSizeHints>) -> SizeHints {
    let Some(raw) = raw else {
        return SizeHints::default();
    };

    let (min_w, min_h) = raw
        .min_size
        .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32))
        .unwrap_or_default();
    let (base_w, base_h) = raw
        .base_size
        .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32))
        .unwrap_or((min_w, min_h));
    let (min_w, min_h) = if raw.min_size.is_none() {
        (base_w, base_h)
    } else {
        (min_w, min_h)
    };
    let (max_w, max_h) = raw
        .max_size
        .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32))
        .unwrap_or_default();
    let (inc_w, inc_h) = raw
        .size_increment
        .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32))
        .unwrap_or_default();

    // min bounds h/w from below (y over x), max bounds w/h from above
    let (min_aspect, max_aspect) = match raw.aspect {
        Some((min, max)) if min.numerator != 0 && max.denominator != 0 => (
            min.denominator as f32 / min.numerator as f32,
            max.numerator as f32 / max.denominator as f32,
        ),
        _ => (0.0, 0.0),
    };

    SizeHints {
        base_w,
        base_h,
        inc_w,
        inc_h,
        max_w,
        max_h,
        min_w,
        min_h,
        min_aspect,
        max_aspect,
    }
}

pub(crate) fn to_wm_hints(raw: Option<WmHints>) -> Option<crate::x::WmHints> {
    raw.map(|h| crate::x::WmHints {
        urgent: h.urgent,
        accepts_input: h.input,
    })
}

pub(crate) fn from_wm_hints(ours: crate::x::WmHints) -> WmHints {
    let mut hints = WmHints::default();
    hints.urgent = ours.urgent;
    hints.input = ours.accepts_input;

    hints
}

pub(crate) fn to_monitor_rect(x: i16, y: i16, w: u16, h: u16) -> Option<Rect> {
    if w == 0 || h == 0 {
        return None;
    }

    Some(Rect::new(x as i32, y as i32, w as u32, h as u32))
}
