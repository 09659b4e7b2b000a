/*!
 * Execution Contexts
 *
 * Hosted stand-in for saved machine state. Each context is a one-slot mailbox;
 * a process context is additionally backed by its own thread, the way a
 * kernel stack backs a process. `switch` hands the table lock to the context
 * being loaded and parks the caller until something switches back to it.
 *
 * Only one flow per mailbox ever runs at a time, so scheduling stays fully
 * deterministic on a single CPU.
 */

use super::table::TableGuard;
use crate::core::errors::ResourceError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread;

enum Handoff {
    Run(TableGuard),
    Abort,
}

struct Mailbox {
    pending: Mutex<Option<Handoff>>,
    ready: Condvar,
}

impl Mailbox {
    fn receive(&self) -> Handoff {
        let mut pending = self.pending.lock();
        loop {
            if let Some(handoff) = pending.take() {
                return handoff;
            }
            self.ready.wait(&mut pending);
        }
    }
}

/// Unwound through a parked process thread when its context is aborted
pub(crate) struct Aborted;

#[derive(Clone)]
pub(crate) struct Context {
    mailbox: Arc<Mailbox>,
}

impl Context {
    /// A context for a flow that already runs (a CPU's scheduler loop)
    pub fn new() -> Self {
        Self {
            mailbox: Arc::new(Mailbox {
                pending: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// A context whose first resume runs `entry` on a fresh thread
    ///
    /// `entry` receives the table lock exactly as the scheduler held it.
    pub fn spawn<F>(name: String, entry: F) -> Result<Self, ResourceError>
    where
        F: FnOnce(TableGuard) + Send + 'static,
    {
        let context = Self::new();
        let mailbox = Arc::clone(&context.mailbox);

        thread::Builder::new()
            .name(name)
            .spawn(move || match mailbox.receive() {
                Handoff::Run(held) => entry(held),
                Handoff::Abort => {}
            })
            .map_err(|e| ResourceError::Context(e.to_string()))?;

        Ok(context)
    }

    fn deliver(&self, handoff: Handoff) {
        let mut pending = self.mailbox.pending.lock();
        if pending.is_some() {
            panic!("context switch into a context that is already resuming");
        }
        *pending = Some(handoff);
        self.mailbox.ready.notify_one();
    }

    /// Save the running flow into `save`, resume `load`
    ///
    /// Returns when some flow switches back into `save`, carrying the lock it
    /// held at that moment.
    pub fn switch(save: &Context, load: &Context, held: TableGuard) -> TableGuard {
        load.deliver(Handoff::Run(held));
        match save.mailbox.receive() {
            Handoff::Run(held) => held,
            Handoff::Abort => panic::resume_unwind(Box::new(Aborted)),
        }
    }

    /// Resume `load` without saving the running flow, which must then finish
    pub fn hand_off(load: &Context, held: TableGuard) {
        load.deliver(Handoff::Run(held));
    }

    /// Make a parked flow unwind instead of resuming
    pub fn abort(&self) {
        let mut pending = self.mailbox.pending.lock();
        if pending.is_none() {
            *pending = Some(Handoff::Abort);
            self.mailbox.ready.notify_one();
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pending", &self.mailbox.pending.lock().is_some())
            .finish()
    }
}
