//! Terminal interrupt handling and the blocking `read_char` syscall
//! (spec.md §4.10 — component C10).

use crate::hal::{Hal, Ipl};
use crate::list::Pid;
use crate::process::ProcessState;

impl<H: Hal> crate::kernel::Kernel<H> {
    /// `int_terminal`: read one byte off the port and append it to the
    /// input buffer, waking the oldest blocked reader if any. Runs at
    /// interrupt level; a full buffer silently drops the new byte.
    pub fn handle_terminal_interrupt(&mut self) {
        let byte = self.hal.leer_puerto_terminal();
        if self.term_buf.is_full() {
            return;
        }
        self.term_buf.push(byte);

        let prev = self.hal.set_ipl(Ipl::Nivel3);
        if let Some(waiter) = self.term_wait.pop_head(&mut self.links) {
            self.procs.get_mut(waiter).state = ProcessState::Ready;
            self.ready.append(&mut self.links, waiter);
        }
        self.hal.set_ipl(prev);
    }

    /// `sis_leer_caracter`: return the oldest buffered byte, blocking the
    /// caller if the buffer is empty. Another suspension point under the
    /// same re-test-on-wake discipline as `lock`/`crear_mutex` — see
    /// `mutex_ops.rs`'s module docs for why this doesn't loop here either.
    pub fn leer_caracter(&mut self) -> TerminalReadOutcome {
        if let Some(byte) = self.term_buf.pop() {
            return TerminalReadOutcome::Ready(byte);
        }

        let current = self.current.expect("leer_caracter with no current process");
        let prev = self.hal.set_ipl(Ipl::Nivel2);

        self.procs.get_mut(current).state = ProcessState::Blocked;
        let prev3 = self.hal.set_ipl(Ipl::Nivel3);
        self.ready.remove(&mut self.links, current);
        self.term_wait.append(&mut self.links, current);
        self.hal.set_ipl(prev3);

        let next = self.schedule();
        self.procs.get_mut(next).state = ProcessState::Running;
        self.current = Some(next);
        let (old_ctx, new_ctx) = self.procs.context_pair(current, next);
        self.hal.cambio_contexto(Some(old_ctx), new_ctx);

        self.hal.set_ipl(prev);
        TerminalReadOutcome::Blocked { now_current: next }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReadOutcome {
    Ready(u8),
    Blocked { now_current: Pid },
}

#[cfg(test)]
mod tests {
    use super::TerminalReadOutcome;
    use crate::hal_mock::MockHal;
    use crate::kernel::Kernel;
    use crate::process::ProcessState;

    /// S6 — terminal read: an empty buffer blocks the reader; the next
    /// interrupt both fills the buffer and wakes it.
    #[test]
    fn read_char_blocks_on_empty_buffer_then_interrupt_wakes_it() {
        let mut kernel = Kernel::new(MockHal::new());
        let reader = kernel.crear_tarea("reader").unwrap();
        let other = kernel.crear_tarea("other").unwrap();
        let picked = kernel.schedule();
        kernel.procs.get_mut(picked).state = ProcessState::Running;
        kernel.current = Some(picked);
        assert_eq!(picked, reader);

        let outcome = kernel.leer_caracter();
        assert_eq!(outcome, TerminalReadOutcome::Blocked { now_current: other });
        assert_eq!(kernel.procs.get(reader).state, ProcessState::Blocked);

        kernel.hal().set_term_port_byte(b'h');
        kernel.handle_terminal_interrupt();

        assert_eq!(kernel.procs.get(reader).state, ProcessState::Ready);

        kernel.current = Some(reader);
        kernel.procs.get_mut(reader).state = ProcessState::Running;
        assert_eq!(kernel.leer_caracter(), TerminalReadOutcome::Ready(b'h'));
    }

    #[test]
    fn read_char_returns_immediately_when_buffer_nonempty() {
        let mut kernel = Kernel::new(MockHal::new());
        kernel.crear_tarea("only").unwrap();
        let picked = kernel.schedule();
        kernel.procs.get_mut(picked).state = ProcessState::Running;
        kernel.current = Some(picked);

        kernel.hal().set_term_port_byte(b'z');
        kernel.handle_terminal_interrupt();

        assert_eq!(kernel.leer_caracter(), TerminalReadOutcome::Ready(b'z'));
    }
}
