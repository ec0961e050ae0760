use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::ShellError;
use crate::pipeline::ProcessRecord;

pub const MAX_JOBS: usize = 16;

/// Foreground reconciliation: every record pushed here is reaped exactly
/// once by a pid-targeted blocking wait. Targeting the pid keeps a background
/// child that happens to finish first out of the reap.
pub struct WaitSet {
    records: Vec<ProcessRecord>,
}

impl WaitSet {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push_all(&mut self, records: Vec<ProcessRecord>) {
        self.records.extend(records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Block until every held record has been reaped, reporting each pid as
    /// it completes. Draining the records up front means no pid can ever be
    /// waited on twice.
    pub fn wait_all(&mut self) -> Vec<(Pid, WaitStatus)> {
        let mut reaped = Vec::new();
        for record in self.records.drain(..) {
            match waitpid(record.pid, None) {
                Ok(status) => {
                    println!("Process {} finished", record.pid);
                    reaped.push((record.pid, status));
                }
                Err(err) => {
                    eprintln!("wait: stage {} pid {}: {}", record.stage, record.pid, err)
                }
            }
        }
        reaped
    }
}

/// Fixed-capacity table of live background pids, polled between prompts.
///
/// Every stage of a backgrounded pipeline is registered, not just the
/// terminal one; a middle stage nobody waits on would linger as a zombie
/// the table never observes.
pub struct JobRegistry {
    slots: [Option<Pid>; MAX_JOBS],
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_JOBS],
        }
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// All-or-nothing registration of a pipeline's records. When the table
    /// cannot hold every record, nothing is registered and the caller falls
    /// back to a synchronous wait. Returns the slot of the last (terminal)
    /// record for the start report.
    pub fn register_all(&mut self, records: &[ProcessRecord]) -> Result<usize, ShellError> {
        if self.free_slots() < records.len() {
            return Err(ShellError::RegistryFull(MAX_JOBS));
        }

        let free: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut last_slot = 0;
        for (&slot, record) in free.iter().zip(records) {
            self.slots[slot] = Some(record.pid);
            last_slot = slot;
        }
        Ok(last_slot)
    }

    /// Non-blocking sweep; called once per interactive-loop iteration.
    pub fn poll(&mut self) -> Vec<(Pid, WaitStatus)> {
        self.sweep(Some(WaitPidFlag::WNOHANG))
    }

    /// Blocking drain; called once when the shell shuts down so no child
    /// outlives its reporter.
    pub fn drain(&mut self) -> Vec<(Pid, WaitStatus)> {
        self.sweep(None)
    }

    fn sweep(&mut self, flags: Option<WaitPidFlag>) -> Vec<(Pid, WaitStatus)> {
        let mut reaped = Vec::new();
        for slot in self.slots.iter_mut() {
            if let Some(pid) = *slot {
                match waitpid(pid, flags) {
                    Ok(WaitStatus::StillAlive) => {}
                    Ok(status) => {
                        println!("Process {} finished", pid);
                        reaped.push((pid, status));
                        *slot = None;
                    }
                    Err(err) => {
                        // A pid the kernel no longer knows about can never be
                        // observed later, so its slot is cleared as well.
                        eprintln!("jobs: pid {}: {}", pid, err);
                        *slot = None;
                    }
                }
            }
        }
        reaped
    }
}
