//! Global shortcut capture.
//!
//! A listen-only Quartz event tap runs on a dedicated thread with its own run
//! loop and forwards every key press carrying at least one modifier as a
//! `Shortcut`. Matching against bindings happens downstream.

use crate::models::{ArrowDirection, Key, ModifierKey, Shortcut};
use crate::Result;
use tokio::sync::mpsc::UnboundedSender;

// CGEventFlags bits
const FLAG_SHIFT: u64 = 0x0002_0000;
const FLAG_CONTROL: u64 = 0x0004_0000;
const FLAG_OPTION: u64 = 0x0008_0000;
const FLAG_COMMAND: u64 = 0x0010_0000;
const FLAG_FUNCTION: u64 = 0x0080_0000;

/// Key for an ANSI virtual key code
pub fn key_for_keycode(keycode: u16) -> Option<Key> {
    let letter = |c| Some(Key::Letter(c));
    match keycode {
        0 => letter('a'),
        1 => letter('s'),
        2 => letter('d'),
        3 => letter('f'),
        4 => letter('h'),
        5 => letter('g'),
        6 => letter('z'),
        7 => letter('x'),
        8 => letter('c'),
        9 => letter('v'),
        11 => letter('b'),
        12 => letter('q'),
        13 => letter('w'),
        14 => letter('e'),
        15 => letter('r'),
        16 => letter('y'),
        17 => letter('t'),
        18 => Some(Key::Number(1)),
        19 => Some(Key::Number(2)),
        20 => Some(Key::Number(3)),
        21 => Some(Key::Number(4)),
        22 => Some(Key::Number(6)),
        23 => Some(Key::Number(5)),
        24 => Some(Key::Equal),
        25 => Some(Key::Number(9)),
        26 => Some(Key::Number(7)),
        27 => Some(Key::Minus),
        28 => Some(Key::Number(8)),
        29 => Some(Key::Number(0)),
        31 => letter('o'),
        32 => letter('u'),
        34 => letter('i'),
        35 => letter('p'),
        36 | 76 => Some(Key::Return),
        37 => letter('l'),
        38 => letter('j'),
        40 => letter('k'),
        45 => letter('n'),
        46 => letter('m'),
        48 => Some(Key::Tab),
        49 => Some(Key::Space),
        51 => Some(Key::Delete),
        53 => Some(Key::Escape),
        96 => Some(Key::Function(5)),
        97 => Some(Key::Function(6)),
        98 => Some(Key::Function(7)),
        99 => Some(Key::Function(3)),
        100 => Some(Key::Function(8)),
        101 => Some(Key::Function(9)),
        103 => Some(Key::Function(11)),
        109 => Some(Key::Function(10)),
        111 => Some(Key::Function(12)),
        118 => Some(Key::Function(4)),
        120 => Some(Key::Function(2)),
        122 => Some(Key::Function(1)),
        123 => Some(Key::Arrow(ArrowDirection::Left)),
        124 => Some(Key::Arrow(ArrowDirection::Right)),
        125 => Some(Key::Arrow(ArrowDirection::Down)),
        126 => Some(Key::Arrow(ArrowDirection::Up)),
        _ => None,
    }
}

/// Shortcut for a key-down event, or `None` for unmapped keys and plain
/// typing without modifiers.
///
/// Arrow and function keys always carry the `fn` flag, so it only counts as a
/// modifier for other keys.
pub fn shortcut_from_event(keycode: u16, flags: u64) -> Option<Shortcut> {
    let key = key_for_keycode(keycode)?;
    let implicit_fn = matches!(key, Key::Arrow(_) | Key::Function(_));

    let mut modifiers = Vec::new();
    for (bit, modifier) in [
        (FLAG_COMMAND, ModifierKey::Command),
        (FLAG_CONTROL, ModifierKey::Control),
        (FLAG_OPTION, ModifierKey::Option),
        (FLAG_SHIFT, ModifierKey::Shift),
    ] {
        if flags & bit != 0 {
            modifiers.push(modifier);
        }
    }
    if flags & FLAG_FUNCTION != 0 && !implicit_fn {
        modifiers.push(ModifierKey::Function);
    }

    if modifiers.is_empty() {
        return None;
    }
    Some(Shortcut::new(modifiers, key))
}

/// Start the event tap thread. Shortcuts are sent on `sender` until the
/// receiver is dropped.
#[cfg(target_os = "macos")]
pub fn spawn_listener(sender: UnboundedSender<Shortcut>) -> Result<std::thread::JoinHandle<()>> {
    use crate::GridSnapError;
    use anyhow::Context;
    use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
    use core_graphics::event::{
        CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
        EventField,
    };
    use tracing::{debug, error, info};

    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();

    let handle = std::thread::Builder::new()
        .name("gridsnap-hotkeys".into())
        .spawn(move || {
            let tap = CGEventTap::new(
                CGEventTapLocation::HID,
                CGEventTapPlacement::HeadInsertEventTap,
                CGEventTapOptions::ListenOnly,
                vec![CGEventType::KeyDown],
                move |_proxy, _event_type, event| {
                    let keycode =
                        event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
                    if let Some(shortcut) = shortcut_from_event(keycode, event.get_flags().bits()) {
                        if sender.send(shortcut).is_err() {
                            debug!("Shortcut receiver dropped");
                        }
                    }
                    None
                },
            );

            let tap = match tap {
                Ok(tap) => tap,
                Err(()) => {
                    let _ = ready_tx.send(Err(
                        "CGEventTapCreate failed; is Input Monitoring granted?".into()
                    ));
                    return;
                }
            };

            let source = match tap.mach_port.create_runloop_source(0) {
                Ok(source) => source,
                Err(()) => {
                    let _ = ready_tx.send(Err("Failed to create run loop source".into()));
                    return;
                }
            };

            let run_loop = CFRunLoop::get_current();
            unsafe { run_loop.add_source(&source, kCFRunLoopCommonModes) };
            tap.enable();

            let _ = ready_tx.send(Ok(()));
            info!("Hotkey listener running");
            CFRunLoop::run_current();
            error!("Hotkey run loop exited");
        })
        .context("failed to spawn hotkey thread")?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(message)) => Err(GridSnapError::MacOSAPIError(message).into()),
        Err(_) => Err(GridSnapError::MacOSAPIError("Hotkey thread exited early".into()).into()),
    }
}

#[cfg(not(target_os = "macos"))]
pub fn spawn_listener(_sender: UnboundedSender<Shortcut>) -> Result<std::thread::JoinHandle<()>> {
    Err(crate::GridSnapError::MacOSAPIError(
        "Global shortcuts are not available on this platform".into(),
    )
    .into())
}
