// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal-driven shutdown.
//!
//! The stop signals are blocked on the calling thread before any engine
//! thread starts (threads spawned afterwards inherit the mask) and a
//! dedicated thread consumes them with `sigwait`. Delivery of a stop
//! signal wakes that thread, which calls the supervisor's cancel hook;
//! shutdown work never happens in signal context. At teardown the loop is
//! drained with a process-directed self-signal. The signals stay blocked
//! after the loop ends so a late pending signal cannot kill the process.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use nix::sys::signal::{kill, pthread_sigmask, SigSet, SigmaskHow, Signal};
use nix::unistd::Pid;
use tracing::{error, trace, warn};

use crate::supervisor::registry::ProcessRegistry;

/// Signal names accepted by the `stop-signal` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopSignal {
    Interrupt,
    Terminate,
    Pipe,
}

impl StopSignal {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "interrupt" => Some(Self::Interrupt),
            "terminate" => Some(Self::Terminate),
            "pipe" => Some(Self::Pipe),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Pipe => "pipe",
        }
    }

    fn signal(self) -> Signal {
        match self {
            Self::Interrupt => Signal::SIGINT,
            Self::Terminate => Signal::SIGTERM,
            Self::Pipe => Signal::SIGPIPE,
        }
    }
}

/// Block `signals` on the calling thread.
///
/// `Main::run` does this itself; call it early on any other thread that
/// exists before the supervisor starts (tests, embedding main functions),
/// otherwise a stop signal may be delivered to a thread with default
/// disposition and terminate the process.
pub fn block_signals(signals: &BTreeSet<StopSignal>) {
    let set = sigset_of(signals);
    if let Err(err) = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), None) {
        warn!("blocking stop signals failed: {err}");
    }
}

fn sigset_of(signals: &BTreeSet<StopSignal>) -> SigSet {
    let mut set = SigSet::empty();
    for stop_signal in signals {
        set.add(stop_signal.signal());
    }
    set
}

/// The dedicated signal-consuming thread.
pub(crate) struct SignalLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    wake: Signal,
}

impl SignalLoop {
    /// Block the signals and start the thread. `None` when `signals` is
    /// empty.
    pub(crate) fn start(
        signals: &BTreeSet<StopSignal>,
        registry: Arc<ProcessRegistry>,
        cancel: impl Fn() + Send + 'static,
    ) -> Option<Self> {
        let first = *signals.iter().next()?;
        block_signals(signals);

        let set = sigset_of(signals);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::spawn(move || loop {
            let signal = match set.wait() {
                Ok(signal) => signal,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(err) => {
                    error!("waiting for stop signals failed: {err}");
                    break;
                }
            };
            trace!(signal = %signal, "signal thread woke");
            if thread_stop.load(Ordering::SeqCst) || registry.running_count() == 0 {
                break;
            }
            cancel();
            if registry.running_count() == 0 {
                break;
            }
        });

        Some(Self { stop, handle: Some(handle), wake: first.signal() })
    }

    /// Drain the loop: raise one stop signal at the process so the thread
    /// wakes, then join it.
    pub(crate) fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(err) = kill(Pid::this(), self.wake) {
            warn!("waking the signal thread failed: {err}");
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
