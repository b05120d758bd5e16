//! escher: a dynamic tiling window manager for X11
//!
//! Configuration is compile time: edit the bindings and [Config] below and
//! rebuild, in the spirit of the suckless window managers.
use escher::{
    core::{
        actions,
        bindings::{
            keysym::*,
            modifier::{CONTROL, MOD1, SHIFT},
            ButtonBinding, ButtonSpec, ClickTarget, KeyBinding, KeySpec,
        },
        Config, WindowManager,
    },
    x11rb::RustConn,
    Result,
};
use std::process::exit;
use tracing_subscriber::{self, EnvFilter};

const MODKEY: u16 = MOD1;

const TERMINAL: &[&str] = &["xterm"];
const LAUNCHER: &[&str] = &["dmenu_run"];

fn key(mods: u16, keysym: u32, action: impl FnMut(&mut escher::core::State, &RustConn) -> Result<()> + 'static) -> KeyBinding<RustConn> {
    KeyBinding {
        spec: KeySpec { mods, keysym },
        action: Box::new(action),
    }
}

fn button(
    click: ClickTarget,
    mods: u16,
    button: u8,
    action: impl FnMut(&mut escher::core::State, &RustConn, Option<u32>) -> Result<()> + 'static,
) -> ButtonBinding<RustConn> {
    ButtonBinding {
        spec: ButtonSpec { click, mods, button },
        action: Box::new(action),
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn key_bindings() -> Vec<KeyBinding<RustConn>> {
    let mut keys = vec![
        key(MODKEY, XK_P, |_, _| actions::spawn(&argv(LAUNCHER))),
        key(MODKEY | SHIFT, XK_RETURN, |_, _| actions::spawn(&argv(TERMINAL))),
        key(MODKEY, XK_B, actions::toggle_bar),
        key(MODKEY, XK_J, |s, x| actions::focus_stack(s, x, 1)),
        key(MODKEY, XK_K, |s, x| actions::focus_stack(s, x, -1)),
        key(MODKEY, XK_I, |s, x| actions::inc_nmaster(s, x, 1)),
        key(MODKEY, XK_D, |s, x| actions::inc_nmaster(s, x, -1)),
        key(MODKEY, XK_H, |s, x| actions::set_mfact(s, x, -0.05)),
        key(MODKEY, XK_L, |s, x| actions::set_mfact(s, x, 0.05)),
        key(MODKEY, XK_RETURN, |s, x| actions::zoom(s, x)),
        key(MODKEY, XK_TAB, |s, x| actions::view(s, x, 0)),
        key(MODKEY | SHIFT, XK_C, actions::kill_client),
        key(MODKEY, XK_T, |s, x| actions::set_layout(s, x, Some(0))),
        key(MODKEY, XK_F, |s, x| actions::set_layout(s, x, Some(1))),
        key(MODKEY, XK_M, |s, x| actions::set_layout(s, x, Some(2))),
        key(MODKEY, XK_SPACE, |s, x| actions::set_layout(s, x, None)),
        key(MODKEY | SHIFT, XK_SPACE, actions::toggle_floating),
        key(MODKEY, XK_0, |s, x| actions::view(s, x, !0)),
        key(MODKEY | SHIFT, XK_0, |s, x| actions::tag(s, x, !0)),
        key(MODKEY, XK_COMMA, |s, x| actions::focus_mon(s, x, -1)),
        key(MODKEY, XK_PERIOD, |s, x| actions::focus_mon(s, x, 1)),
        key(MODKEY | SHIFT, XK_COMMA, |s, x| actions::tag_mon(s, x, -1)),
        key(MODKEY | SHIFT, XK_PERIOD, |s, x| actions::tag_mon(s, x, 1)),
        key(MODKEY | SHIFT, XK_Q, actions::quit),
    ];

    for i in 0..9u32 {
        let keysym = XK_1 + i;
        keys.push(key(MODKEY, keysym, move |s, x| actions::view(s, x, 1 << i)));
        keys.push(key(MODKEY | CONTROL, keysym, move |s, x| {
            actions::toggle_view(s, x, 1 << i)
        }));
        keys.push(key(MODKEY | SHIFT, keysym, move |s, x| {
            actions::tag(s, x, 1 << i)
        }));
        keys.push(key(MODKEY | CONTROL | SHIFT, keysym, move |s, x| {
            actions::toggle_tag(s, x, 1 << i)
        }));
    }

    keys
}

fn button_bindings() -> Vec<ButtonBinding<RustConn>> {
    vec![
        button(ClickTarget::LayoutSymbol, 0, 1, |s, x, _| {
            actions::set_layout(s, x, None)
        }),
        button(ClickTarget::LayoutSymbol, 0, 3, |s, x, _| {
            actions::set_layout(s, x, Some(2))
        }),
        button(ClickTarget::WinTitle, 0, 2, |s, x, _| actions::zoom(s, x)),
        button(ClickTarget::StatusText, 0, 2, |_, _, _| {
            actions::spawn(&argv(TERMINAL))
        }),
        button(ClickTarget::ClientWin, MODKEY, 1, |s, x, _| {
            actions::move_mouse(s, x)
        }),
        button(ClickTarget::ClientWin, MODKEY, 2, |s, x, _| {
            actions::toggle_floating(s, x)
        }),
        button(ClickTarget::ClientWin, MODKEY, 3, |s, x, _| {
            actions::resize_mouse(s, x)
        }),
        button(ClickTarget::TagBar, 0, 1, |s, x, arg| {
            actions::view(s, x, arg.unwrap_or_default())
        }),
        button(ClickTarget::TagBar, 0, 3, |s, x, arg| {
            actions::toggle_view(s, x, arg.unwrap_or_default())
        }),
        button(ClickTarget::TagBar, MODKEY, 1, |s, x, arg| {
            actions::tag(s, x, arg.unwrap_or_default())
        }),
        button(ClickTarget::TagBar, MODKEY, 3, |s, x, arg| {
            actions::toggle_tag(s, x, arg.unwrap_or_default())
        }),
    ]
}

// LC_CTYPE is consulted for parity with other window managers, but a missing
// locale only costs a warning.
fn check_locale() {
    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LC_CTYPE"))
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default()
        .to_lowercase();

    if !locale.contains("utf-8") && !locale.contains("utf8") {
        eprintln!("warning: no locale support");
    }
}

fn run() -> Result<()> {
    let conn = RustConn::new()?;
    let mut wm = WindowManager::new(conn, Config::default(), key_bindings(), button_bindings())?;

    wm.run()
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => (),
        [v] if v == "-v" => {
            println!("escher-{}", env!("CARGO_PKG_VERSION"));
            return;
        }
        _ => {
            eprintln!("usage: escher [-v]");
            exit(1);
        }
    }

    check_locale();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run() {
        eprintln!("escher: {e}");
        exit(1);
    }
}
