//! A host-testable [`Hal`] implementation. Exists purely so the kernel
//! logic in `process_ops.rs`, `scheduler.rs`, `mutex_ops.rs`, `clock.rs` and
//! `terminal_ops.rs` can run under `cargo test` without real interrupts, a
//! real loader, or real context switches.
//!
//! `cambio_contexto` is the one place this mock deliberately diverges from
//! hardware semantics: on real silicon the call never returns to its caller
//! until the CPU switches back. Here it's a recording no-op, so kernel
//! methods built around it are written to return the new current pid
//! instead of relying on the call to diverge (see DESIGN.md "Open
//! Questions").

use core::cell::{Cell, RefCell};

use crate::config::MAX_NOM_MUT;
use crate::hal::{Context as ContextTrait, Hal, Image as ImageTrait, Ipl, Stack as StackTrait};

/// Max number of syscall argument registers the mock models (0 = call
/// number, 1..=4 = arguments) — generous for this kernel's widest syscall
/// (`crear_mutex(name*, type)` plus the implicit call-number slot).
const NUM_REGISTERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockContext(pub u64);

impl ContextTrait for MockContext {
    fn empty() -> Self {
        MockContext(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockImage(pub u64);
impl ImageTrait for MockImage {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStack(pub u64);
impl StackTrait for MockStack {}

pub struct MockHal {
    ipl: Cell<Ipl>,
    halt_count: Cell<u32>,
    switch_count: Cell<u32>,
    sw_int_count: Cell<u32>,
    next_handle: Cell<u64>,
    user_mode: Cell<bool>,
    term_port: Cell<u8>,
    registers: RefCell<[u64; NUM_REGISTERS]>,
    user_string: RefCell<([u8; MAX_NOM_MUT], usize)>,
    last_user_write: RefCell<([u8; 16], usize)>,
}

impl MockHal {
    pub fn new() -> Self {
        MockHal {
            ipl: Cell::new(Ipl::Nivel1),
            halt_count: Cell::new(0),
            switch_count: Cell::new(0),
            sw_int_count: Cell::new(0),
            next_handle: Cell::new(1),
            user_mode: Cell::new(false),
            term_port: Cell::new(0),
            registers: RefCell::new([0; NUM_REGISTERS]),
            user_string: RefCell::new(([0; MAX_NOM_MUT], 0)),
            last_user_write: RefCell::new(([0; 16], 0)),
        }
    }

    /// The bytes the last [`Hal::escribir_bytes_usuario`] call wrote.
    pub fn last_user_write(&self) -> ([u8; 16], usize) {
        self.last_user_write.borrow().clone()
    }

    /// Preloads register `i` for the next syscall dispatch a test drives.
    pub fn set_register(&self, i: usize, value: u64) {
        self.registers.borrow_mut()[i] = value;
    }

    /// Makes the next [`Hal::leer_cadena_usuario`] call (for any pointer
    /// value) return `name`. There's only ever one "current" user string in
    /// these tests, so the mock doesn't model distinct addresses.
    pub fn set_user_string(&self, name: &[u8]) {
        let mut slot = self.user_string.borrow_mut();
        slot.0[..name.len()].copy_from_slice(name);
        slot.1 = name.len();
    }

    /// Number of times [`Hal::halt`] was called, i.e. how many times the
    /// idle loop actually had to wait.
    pub fn halt_count(&self) -> u32 {
        self.halt_count.get()
    }

    /// Number of completed [`Hal::cambio_contexto`] calls.
    pub fn switch_count(&self) -> u32 {
        self.switch_count.get()
    }

    /// Number of [`Hal::activar_int_sw`] calls.
    pub fn sw_int_count(&self) -> u32 {
        self.sw_int_count.get()
    }

    /// Makes the next [`Hal::viene_de_modo_usuario`] call (and every one
    /// after it, until changed again) report `value`.
    pub fn set_user_mode(&self, value: bool) {
        self.user_mode.set(value);
    }

    /// Queues a byte for the next [`Hal::leer_puerto_terminal`] call to
    /// return.
    pub fn set_term_port_byte(&self, byte: u8) {
        self.term_port.set(byte);
    }

    fn fresh_handle(&self) -> u64 {
        let h = self.next_handle.get();
        self.next_handle.set(h + 1);
        h
    }
}

impl Hal for MockHal {
    type Context = MockContext;
    type Image = MockImage;
    type Stack = MockStack;

    fn set_ipl(&self, level: Ipl) -> Ipl {
        let prev = self.ipl.get();
        self.ipl.set(level);
        prev
    }

    fn halt(&self) {
        self.halt_count.set(self.halt_count.get() + 1);
    }

    fn crear_imagen(&self, _prog: &str) -> Option<(Self::Image, u64)> {
        let handle = self.fresh_handle();
        Some((MockImage(handle), handle))
    }

    fn liberar_imagen(&self, _image: Self::Image) {}

    fn crear_pila(&self, _size: usize) -> Self::Stack {
        MockStack(self.fresh_handle())
    }

    fn liberar_pila(&self, _stack: Self::Stack) {}

    fn fijar_contexto_ini(
        &self,
        _image: &Self::Image,
        _stack: &Self::Stack,
        pc: u64,
    ) -> Self::Context {
        MockContext(pc)
    }

    fn cambio_contexto(&self, _from: Option<&mut Self::Context>, _to: &Self::Context) {
        self.switch_count.set(self.switch_count.get() + 1);
    }

    fn viene_de_modo_usuario(&self) -> bool {
        self.user_mode.get()
    }

    fn activar_int_sw(&self) {
        self.sw_int_count.set(self.sw_int_count.get() + 1);
    }

    fn leer_puerto_terminal(&self) -> u8 {
        self.term_port.get()
    }

    fn leer_registro(&self, i: usize) -> u64 {
        self.registers.borrow()[i]
    }

    fn escribir_registro(&self, i: usize, v: u64) {
        self.registers.borrow_mut()[i] = v;
    }

    fn leer_cadena_usuario(&self, _ptr: u64, buf: &mut [u8]) -> usize {
        let slot = self.user_string.borrow();
        let n = slot.1.min(buf.len());
        buf[..n].copy_from_slice(&slot.0[..n]);
        n
    }

    fn leer_bytes_usuario(&self, _ptr: u64, buf: &mut [u8]) {
        let slot = self.user_string.borrow();
        let n = slot.1.min(buf.len());
        buf[..n].copy_from_slice(&slot.0[..n]);
    }

    fn escribir_bytes_usuario(&self, _ptr: u64, buf: &[u8]) {
        let mut slot = self.last_user_write.borrow_mut();
        let n = buf.len().min(slot.0.len());
        slot.0[..n].copy_from_slice(&buf[..n]);
        slot.1 = n;
    }

    fn printk(&self, _args: core::fmt::Arguments) {}

    fn panico(&self, msg: &str) -> ! {
        panic!("{msg}")
    }
}
