/*!
 * Signal Dispatch
 * Moves deliveries out of signal-handler context onto a normal thread
 *
 * The OS-level handler only bumps a per-signal counter and writes one byte
 * to a self-pipe. Counters are drained under the signal's slot lock, so each
 * delivery runs the callback that was installed when it arrived. Installs
 * that replace a callback drain its counter first and retire the deliveries
 * to the dispatcher.
 */

use super::atomic_stats::AtomicSignalStats;
use super::types::{HandlerAction, SignalCallback};
use crate::core::errors::PrimitiveResult;
use crate::core::types::SignalNumber;
use ahash::RandomState;
use dashmap::DashMap;
use nix::errno::Errno;
use nix::libc;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

/// Exclusive upper bound on signal numbers tracked (Linux NSIG is 65)
pub(super) const MAX_SIGNAL: usize = 65;

#[allow(clippy::declare_interior_mutable_const)]
const NO_DELIVERIES: AtomicU32 = AtomicU32::new(0);

/// Deliveries recorded by the handler and not yet dispatched
static PENDING: [AtomicU32; MAX_SIGNAL] = [NO_DELIVERIES; MAX_SIGNAL];

/// Write end of the self-pipe, -1 until the dispatcher starts
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

/// Installed slot for one signal
#[derive(Debug, Default)]
pub(super) struct WatchSlot {
    /// Action installed through the registry, `None` until the first install
    pub action: Option<HandlerAction>,
}

impl WatchSlot {
    fn callback(&self) -> Option<SignalCallback> {
        match &self.action {
            Some(HandlerAction::Custom(callback)) => Some(callback.clone()),
            _ => None,
        }
    }
}

pub(super) type SlotTable = DashMap<SignalNumber, Arc<Mutex<WatchSlot>>, RandomState>;

/// Deliveries recorded under a callback that has since been replaced
pub(super) struct Retired {
    pub signum: SignalNumber,
    pub callback: SignalCallback,
    pub count: u32,
}

/// Take the deliveries recorded for `signum` since the last drain
///
/// Callers hold the signal's slot lock.
pub(super) fn take_pending(signum: SignalNumber) -> u32 {
    usize::try_from(signum)
        .ok()
        .and_then(|i| PENDING.get(i))
        .map_or(0, |pending| pending.swap(0, Ordering::SeqCst))
}

/// OS-level handler for watched signals
///
/// Async-signal-safe: touches only atomics and write(2), and preserves errno.
pub(super) extern "C" fn trampoline(signum: libc::c_int) {
    let saved = Errno::last_raw();

    if let Some(pending) = usize::try_from(signum).ok().and_then(|i| PENDING.get(i)) {
        pending.fetch_add(1, Ordering::SeqCst);
    }

    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = [signum as u8];
        // SAFETY: fd is the non-blocking write end owned by the running dispatcher;
        // a full pipe already guarantees a wakeup, so the result is ignored.
        unsafe {
            libc::write(fd, byte.as_ptr().cast(), 1);
        }
    }

    Errno::set_raw(saved);
}

/// Running dispatcher thread, its wake pipe and retirement channel
pub(super) struct Dispatcher {
    wake: UnixStream,
    retired: mpsc::UnboundedSender<Retired>,
    _thread: JoinHandle<()>,
}

impl Dispatcher {
    pub(super) fn spawn(
        name: &str,
        slots: Arc<SlotTable>,
        stats: Arc<AtomicSignalStats>,
    ) -> PrimitiveResult<Self> {
        let (wake, reader) = UnixStream::pair()?;
        wake.set_nonblocking(true)?;
        let (retired, retired_rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || dispatch_loop(reader, retired_rx, &slots, &stats))?;

        WAKE_FD.store(wake.as_raw_fd(), Ordering::SeqCst);
        info!(thread = name, "Signal dispatcher started");

        Ok(Self {
            wake,
            retired,
            _thread: thread,
        })
    }

    /// Queue deliveries for a replaced callback and wake the dispatcher
    pub(super) fn retire(&self, retired: Retired) {
        if self.retired.send(retired).is_err() {
            warn!("Signal dispatcher gone, dropping retired deliveries");
            return;
        }
        match (&self.wake).write(&[0]) {
            Ok(_) => {}
            // Full pipe: a wakeup is already queued
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => warn!(error = %e, "Failed to wake signal dispatcher"),
        }
    }
}

fn dispatch_loop(
    mut reader: UnixStream,
    mut retired: mpsc::UnboundedReceiver<Retired>,
    slots: &SlotTable,
    stats: &AtomicSignalStats,
) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("Signal wake pipe closed, dispatcher exiting");
                return;
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, "Signal wake pipe failed, dispatcher exiting");
                return;
            }
        }

        loop {
            match retired.try_recv() {
                Ok(batch) => run_callbacks(stats, batch.signum, batch.count, Some(batch.callback)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Retirement channel closed, dispatcher exiting");
                    return;
                }
            }
        }

        for signum in 1..MAX_SIGNAL {
            if PENDING[signum].load(Ordering::SeqCst) > 0 {
                drain_signal(slots, stats, signum as SignalNumber);
            }
        }
    }
}

fn drain_signal(slots: &SlotTable, stats: &AtomicSignalStats, signum: SignalNumber) {
    let slot = slots.get(&signum).map(|slot| slot.value().clone());
    let (count, callback) = match slot {
        Some(slot) => {
            let guard = slot.lock();
            (take_pending(signum), guard.callback())
        }
        None => (take_pending(signum), None),
    };

    if count > 0 {
        run_callbacks(stats, signum, count, callback);
    }
}

fn run_callbacks(
    stats: &AtomicSignalStats,
    signum: SignalNumber,
    count: u32,
    callback: Option<SignalCallback>,
) {
    stats.add_deliveries(u64::from(count));

    let Some(callback) = callback else {
        debug!(signum, count, "No custom handler installed, dropping deliveries");
        return;
    };

    for _ in 0..count {
        match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(()) => stats.inc_callbacks_run(),
            Err(_) => {
                stats.inc_callback_panics();
                error!(signum, "Signal callback panicked");
            }
        }
    }
}
