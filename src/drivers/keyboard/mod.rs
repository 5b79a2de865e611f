//! PS/2 keyboard IRQ handling: scancode translation feeds
//! `hal_x86_64::X86Hal::leer_puerto_terminal` one byte at a time (spec.md
//! §4.10), rather than the buffering this driver used to do on its own —
//! `term_buf` (`terminal.rs`) is the kernel's input buffer now, so this
//! driver's only job is scancode-to-byte translation.

pub mod scancodes;

use spin::Mutex;
use lazy_static::lazy_static;
use scancodes::{KeyCode, KeyboardState};
use x86_64::instructions::port::Port;

lazy_static! {
    static ref KEYBOARD_STATE: Mutex<KeyboardState> = Mutex::new(KeyboardState::new());
}

pub fn init() {
    let mut port: Port<u8> = Port::new(0x60);
    // Drain whatever scancode the 8042 controller is still holding from
    // before the driver attached.
    let _ = unsafe { port.read() };
    crate::log_info!("PS/2 Keyboard driver initialized.");
}

/// Called from `idt::keyboard_interrupt_handler` with the raw scancode read
/// off port 0x60. Translates it and, if it produced a printable byte,
/// latches it for `leer_puerto_terminal` and returns it — the caller only
/// runs `Kernel::handle_terminal_interrupt` when this returns `Some`, so
/// bare modifier presses and unmapped keys never turn into spurious NUL
/// bytes in the input stream.
pub fn handle_scancode(scancode: u8) -> Option<u8> {
    let keycode = KEYBOARD_STATE.lock().process_scancode(scancode);
    let byte = to_byte(keycode)?;
    crate::hal_x86_64::latch_scancode_byte(byte);
    Some(byte)
}

/// Maps a decoded key to the single byte `sis_leer_caracter` hands back.
/// Keys with no ASCII representation (arrows, function keys, bare
/// modifiers) produce nothing — spec.md §4.10 models the terminal as a
/// byte stream, not a key-event stream.
fn to_byte(key: KeyCode) -> Option<u8> {
    match key {
        KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Space => Some(b' '),
        _ => None,
    }
}
