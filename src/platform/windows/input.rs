//! Synthetic keyboard and mouse input via `SendInput`.

use std::mem;

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEINPUT, VIRTUAL_KEY, VK_CONTROL, VK_PRIOR, VK_RETURN,
};
use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

use crate::types::UiError;
use crate::ui::{Key, Point};

fn keyboard(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), UiError> {
    // SAFETY: every INPUT is fully initialised and cbsize matches the struct.
    let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(UiError::InputFailed(format!(
            "SendInput accepted {} of {} events",
            sent,
            inputs.len()
        )))
    }
}

fn tap(vk: VIRTUAL_KEY, extended: bool) -> [INPUT; 2] {
    let ext = if extended {
        KEYEVENTF_EXTENDEDKEY
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    [keyboard(vk, 0, ext), keyboard(vk, 0, ext | KEYEVENTF_KEYUP)]
}

pub(super) fn press_key(key: Key) -> Result<(), UiError> {
    match key {
        Key::Enter => send(&tap(VK_RETURN, false)),
        Key::PageUp => send(&tap(VK_PRIOR, true)),
        Key::Ctrl(c) if c.is_ascii_alphanumeric() => {
            let letter = VIRTUAL_KEY(c.to_ascii_uppercase() as u16);
            let none = KEYBD_EVENT_FLAGS(0);
            send(&[
                keyboard(VK_CONTROL, 0, none),
                keyboard(letter, 0, none),
                keyboard(letter, 0, KEYEVENTF_KEYUP),
                keyboard(VK_CONTROL, 0, KEYEVENTF_KEYUP),
            ])
        }
        Key::Ctrl(c) => Err(UiError::Unsupported(format!("Ctrl+{:?}", c))),
    }
}

/// Type text as Unicode key events, one UTF-16 unit at a time.
pub(super) fn type_text(text: &str) -> Result<(), UiError> {
    let inputs: Vec<INPUT> = text
        .encode_utf16()
        .flat_map(|unit| {
            [
                keyboard(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                keyboard(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
            ]
        })
        .collect();
    if inputs.is_empty() {
        return Ok(());
    }
    send(&inputs)
}

pub(super) fn mouse_move(to: Point) -> Result<(), UiError> {
    // SAFETY: plain Win32 call with value arguments.
    unsafe { SetCursorPos(to.x, to.y) }
        .map_err(|e| UiError::InputFailed(format!("SetCursorPos({}, {}): {}", to.x, to.y, e)))
}

/// Press (`down = true`) or release the left button at the cursor.
pub(super) fn mouse_button(down: bool) -> Result<(), UiError> {
    let flags = if down {
        MOUSEEVENTF_LEFTDOWN
    } else {
        MOUSEEVENTF_LEFTUP
    };
    send(&[INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }])
}
