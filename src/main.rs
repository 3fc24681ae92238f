/*!
 * vmprim - Main Entry Point
 *
 * Runs a command as a child process under the primitives:
 * - SIGINT/SIGTERM are watched and forwarded to the child
 * - The child is reaped with the wait primitive
 * - The outcome is printed as JSON and mirrored in the exit code
 */

use anyhow::{bail, Context};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use std::process::Command;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use vm_primitives::{init_tracing, HandlerAction, Primitives, WaitOutcome};

const FORWARDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Routes watched signals to the child once it exists
///
/// A signal received before the child starts is held (the latest one wins)
/// and delivered as soon as the pid is known.
#[derive(Debug, Default)]
struct SignalForwarder {
    child: AtomicI32,
    held: AtomicI32,
}

impl SignalForwarder {
    /// Target for `signal`, or `None` while it is held for a child not yet started
    fn on_signal(&self, signal: Signal) -> Option<(NixPid, Signal)> {
        let pid = self.child.load(Ordering::SeqCst);
        if pid > 0 {
            return Some((NixPid::from_raw(pid), signal));
        }

        self.held.store(signal as i32, Ordering::SeqCst);
        // The child may have started between the two loads
        match self.child.load(Ordering::SeqCst) {
            pid if pid > 0 => self.take_held(pid),
            _ => None,
        }
    }

    /// Record the child's pid and release any held signal
    fn child_started(&self, pid: i32) -> Option<(NixPid, Signal)> {
        self.child.store(pid, Ordering::SeqCst);
        self.take_held(pid)
    }

    fn take_held(&self, pid: i32) -> Option<(NixPid, Signal)> {
        match self.held.swap(0, Ordering::SeqCst) {
            0 => None,
            raw => Signal::try_from(raw)
                .ok()
                .map(|signal| (NixPid::from_raw(pid), signal)),
        }
    }
}

fn deliver(target: Option<(NixPid, Signal)>) {
    if let Some((pid, signal)) = target {
        if let Err(errno) = kill(pid, signal) {
            warn!(pid = pid.as_raw(), %errno, signal = signal.as_str(), "Failed to forward signal");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(program) = args.next() else {
        bail!("usage: vmprim <command> [args...]");
    };

    let primitives = Primitives::default();
    let forwarder = Arc::new(SignalForwarder::default());

    for signal in FORWARDED {
        let forwarder = forwarder.clone();
        primitives.watch_signal(
            signal.as_str(),
            HandlerAction::custom(move || deliver(forwarder.on_signal(signal))),
        )?;
    }

    let child = Command::new(&program)
        .args(args)
        .spawn()
        .with_context(|| format!("failed to spawn {}", program))?;
    let pid = i32::try_from(child.id()).context("child pid out of range")?;
    info!(pid, program = %program, "Child started");
    deliver(forwarder.child_started(pid));

    let outcome = primitives.wait_pid_async(pid, false).await?;

    for signal in FORWARDED {
        primitives.watch_signal_descriptor(signal.as_str(), "DEFAULT")?;
    }

    println!("{}", serde_json::to_string(&outcome)?);

    let code = match outcome {
        WaitOutcome::Exited { code, .. } => code,
        WaitOutcome::Signaled { signal, .. } => 128 + signal,
        other => bail!("child {} not reaped: {:?}", pid, other),
    };
    std::process::exit(code);
}
