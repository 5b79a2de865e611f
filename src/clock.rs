//! The clock interrupt handler and the sleep primitive (spec.md §4.4, §4.9 —
//! components C4 and C9): tick accounting, quantum decrement with deferred
//! preemption, and the timed-blocked sweep.

use crate::hal::{Hal, Ipl};
use crate::list::Pid;
use crate::process::ProcessState;

impl<H: Hal> crate::kernel::Kernel<H> {
    /// `int_reloj`. Runs at interrupt level; never blocks, never switches
    /// context itself (deferred preemption is the clock handler's whole
    /// point — see spec.md "Design Notes").
    pub fn handle_clock_tick(&mut self) {
        self.num_ints += 1;

        if let Some(current) = self.current {
            if self.hal.viene_de_modo_usuario() {
                self.procs.get_mut(current).int_usuario += 1;
            } else {
                self.procs.get_mut(current).int_sistema += 1;
            }

            let bcp = self.procs.get_mut(current);
            bcp.ticks_rodaja_restantes = bcp.ticks_rodaja_restantes.saturating_sub(1);
            if bcp.ticks_rodaja_restantes == 0 {
                self.proc_a_expulsar = Some(current);
                self.hal.activar_int_sw();
            }
        }

        self.sweep_timed_blocked();
    }

    /// Walks `timed_blocked`, decrementing each BCP's `ticks_bloq` and
    /// waking any that reach zero. Saves `next` before a wake can unlink
    /// the current entry, so removal mid-walk is safe (spec.md §4.4).
    fn sweep_timed_blocked(&mut self) {
        let mut woken: [Option<Pid>; crate::config::MAX_PROC] = [None; crate::config::MAX_PROC];
        let mut woken_len = 0;

        self.timed_blocked.for_each_removable(&self.links, |pid| {
            let bcp = self.procs.get_mut(pid);
            bcp.ticks_bloq = bcp.ticks_bloq.saturating_sub(1);
            if bcp.ticks_bloq == 0 {
                woken[woken_len] = Some(pid);
                woken_len += 1;
            }
        });

        for pid in &woken[..woken_len] {
            let pid = pid.expect("woken slot populated below its length");
            self.procs.get_mut(pid).state = ProcessState::Ready;
            self.timed_blocked.remove(&mut self.links, pid);
            self.ready.append(&mut self.links, pid);
        }
    }

    /// `sis_dormir(secs)`: block the caller for `secs * TICK` ticks and
    /// dispatch the next ready process. Like `liberar_proceso`, this never
    /// returns under real hardware; under the synchronous `MockHal`
    /// contract it returns the pid that is now current.
    pub fn dormir(&mut self, secs: u32) -> Pid {
        let current = self.current.expect("dormir with no current process");

        self.procs.get_mut(current).ticks_bloq = secs * crate::config::TICK;
        self.procs.get_mut(current).state = ProcessState::Blocked;

        let prev = self.hal.set_ipl(Ipl::Nivel3);
        self.ready.remove(&mut self.links, current);
        self.timed_blocked.append(&mut self.links, current);
        self.hal.set_ipl(prev);

        let next = self.schedule();
        self.procs.get_mut(next).state = ProcessState::Running;
        self.current = Some(next);
        let (old_ctx, new_ctx) = self.procs.context_pair(current, next);
        self.hal.cambio_contexto(Some(old_ctx), new_ctx);
        next
    }

    /// `sis_tiempos_proceso(out)`: writes `{usuario, sistema}` for the
    /// caller through the user pointer `out_ptr` (skipped when null) and
    /// returns the global tick count (spec.md §9 "Open Questions" — the
    /// return value is deliberately `num_ints`, not a per-process figure;
    /// see DESIGN.md).
    ///
    /// `acceso_parametro` brackets only the dereference of `out_ptr`
    /// itself (spec.md §4.7/§6), not the kernel-internal read of the
    /// caller's own counters beforehand.
    pub fn tiempos_proceso(&mut self, out_ptr: u64) -> u64 {
        let current = self.current.expect("tiempos_proceso with no current process");
        let bcp = self.procs.get(current);
        let usuario = bcp.int_usuario;
        let sistema = bcp.int_sistema;

        if out_ptr != 0 {
            let prev = self.hal.set_ipl(Ipl::Nivel3);
            self.acceso_parametro = true;

            let mut buf = [0u8; 16];
            buf[0..8].copy_from_slice(&usuario.to_le_bytes());
            buf[8..16].copy_from_slice(&sistema.to_le_bytes());
            self.hal.escribir_bytes_usuario(out_ptr, &buf);

            self.acceso_parametro = false;
            self.hal.set_ipl(prev);
        }

        self.num_ints
    }
}
