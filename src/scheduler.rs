//! The scheduler and deferred-preemption software interrupt handler
//! (spec.md §4.3, §4.5 — components C3 and C5).

use crate::hal::{Hal, Ipl};
use crate::list::Pid;
use crate::process::ProcessState;
use crate::config::TICKS_POR_RODAJA;

impl<H: Hal> crate::kernel::Kernel<H> {
    /// `planificador`: pick the ready list's head, assigning it a fresh
    /// quantum. Idles at `Ipl::Nivel1` via `Hal::halt` while the ready list
    /// is empty.
    pub fn schedule(&mut self) -> Pid {
        loop {
            if let Some(head) = self.ready.head() {
                self.procs.get_mut(head).ticks_rodaja_restantes = TICKS_POR_RODAJA;
                return head;
            }
            self.wait_for_interrupt();
        }
    }

    /// `espera_int`.
    fn wait_for_interrupt(&self) {
        let prev = self.hal.set_ipl(Ipl::Nivel1);
        self.hal.halt();
        self.hal.set_ipl(prev);
    }

    /// `int_sw`: fires after the clock handler requests a deferred
    /// preemption. Re-verifies the target hasn't since terminated, rotates
    /// it to the ready list's tail, and hands control to whatever the
    /// scheduler picks next.
    ///
    /// Returns the pid that is now current, or `None` if nothing changed
    /// (the process slated for preemption already left the ready list).
    pub fn handle_software_interrupt(&mut self) -> Option<Pid> {
        let current = self.current?;
        if self.proc_a_expulsar != Some(current) {
            return None;
        }

        let prev = self.hal.set_ipl(Ipl::Nivel3);
        self.ready.remove(&mut self.links, current);
        self.ready.append(&mut self.links, current);
        self.procs.get_mut(current).state = ProcessState::Ready;
        self.hal.set_ipl(prev);

        let next = self.schedule();
        self.procs.get_mut(next).state = ProcessState::Running;
        self.current = Some(next);

        let (old_ctx, new_ctx) = self.procs.context_pair(current, next);
        self.hal.cambio_contexto(Some(old_ctx), new_ctx);

        Some(next)
    }
}
