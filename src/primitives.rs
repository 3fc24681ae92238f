/*!
 * Primitives Facade
 * One owned context handed to every primitive call site
 */

use crate::core::config::PrimitivesConfig;
use crate::core::errors::PrimitiveResult;
use crate::core::types::{InterruptFlag, Pid};
use crate::host::{self, CpuTimes};
use crate::monitoring::PrimitiveSpan;
use crate::process::{ProcessWaiter, WaitOutcome, WaitRequest};
use crate::signals::{HandlerAction, SignalWatchRegistry};
use std::path::PathBuf;
use tracing::Instrument;

/// Entry point for the OS-facing primitives of one runtime
///
/// catch/throw needs no context and lives in [`crate::control`].
pub struct Primitives {
    config: PrimitivesConfig,
    signals: &'static SignalWatchRegistry,
    waiter: ProcessWaiter,
}

impl Primitives {
    pub fn new(config: PrimitivesConfig) -> Self {
        Self::with_interrupt(config, InterruptFlag::new())
    }

    /// Share the runtime's cancellation flag with the blocking primitives
    pub fn with_interrupt(config: PrimitivesConfig, interrupt: InterruptFlag) -> Self {
        let signals = SignalWatchRegistry::init(config.clone());
        Self {
            config,
            signals,
            waiter: ProcessWaiter::new(interrupt),
        }
    }

    pub fn config(&self) -> &PrimitivesConfig {
        &self.config
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        self.waiter.interrupt_flag()
    }

    pub fn signals(&self) -> &'static SignalWatchRegistry {
        self.signals
    }

    /// vm_wait_pid
    pub fn wait_pid(&self, pid: Pid, non_blocking: bool) -> PrimitiveResult<WaitOutcome> {
        self.wait(WaitRequest::new(pid, non_blocking))
    }

    pub fn wait(&self, request: WaitRequest) -> PrimitiveResult<WaitOutcome> {
        let span = PrimitiveSpan::new("vm_wait_pid");
        let _entered = span.enter();
        self.waiter.wait(request)
    }

    /// vm_wait_pid from async code, on the blocking pool
    pub async fn wait_pid_async(&self, pid: Pid, non_blocking: bool) -> PrimitiveResult<WaitOutcome> {
        let span = PrimitiveSpan::new("vm_wait_pid");
        self.waiter
            .wait_async(WaitRequest::new(pid, non_blocking))
            .instrument(span.span().clone())
            .await
    }

    /// vm_watch_signal
    pub fn watch_signal(&self, signal_name: &str, action: HandlerAction) -> PrimitiveResult<bool> {
        let span = PrimitiveSpan::new("vm_watch_signal");
        let _entered = span.enter();
        self.signals.watch(signal_name, action)
    }

    /// vm_watch_signal with a string action descriptor
    pub fn watch_signal_descriptor(&self, signal_name: &str, descriptor: &str) -> PrimitiveResult<bool> {
        let action = HandlerAction::from_descriptor(descriptor)?;
        self.watch_signal(signal_name, action)
    }

    /// vm_get_user_home
    pub fn user_home(&self, name: &str) -> PrimitiveResult<PathBuf> {
        host::user_home(name)
    }

    /// vm_time
    pub fn time(&self) -> u64 {
        host::epoch_seconds()
    }

    /// vm_times
    pub fn times(&self) -> CpuTimes {
        host::cpu_times(self.config.fallback_clock_ticks)
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::new(PrimitivesConfig::from_env())
    }
}
