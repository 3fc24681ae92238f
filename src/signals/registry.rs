/*!
 * Signal Watch Registry
 * Process-wide table of installed signal dispositions
 */

use super::atomic_stats::AtomicSignalStats;
use super::dispatch::{take_pending, trampoline, Dispatcher, Retired, SlotTable, WatchSlot};
use super::types::{Disposition, HandlerAction, SignalCallback, SignalId, SignalStats};
use crate::core::config::PrimitivesConfig;
use crate::core::errors::{PrimitiveError, PrimitiveResult};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

static REGISTRY: OnceLock<SignalWatchRegistry> = OnceLock::new();

/// Signal watch registry
///
/// OS dispositions are per-process, so exactly one registry exists. Obtain it
/// with [`SignalWatchRegistry::global`] or [`SignalWatchRegistry::init`] and
/// pass the reference to call sites.
///
/// Installs on the same signal serialize on that signal's slot lock;
/// installs on different signals proceed independently.
pub struct SignalWatchRegistry {
    config: PrimitivesConfig,
    slots: Arc<SlotTable>,
    stats: Arc<AtomicSignalStats>,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl SignalWatchRegistry {
    fn new(config: PrimitivesConfig) -> Self {
        info!(
            restart = config.restart_interrupted_syscalls,
            "Signal watch registry initialized"
        );
        Self {
            config,
            slots: Arc::new(SlotTable::default()),
            stats: Arc::new(AtomicSignalStats::new()),
            dispatcher: Mutex::new(None),
        }
    }

    /// The process registry, configured from the environment on first use
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(|| Self::new(PrimitivesConfig::from_env()))
    }

    /// The process registry, configured with `config` if not yet created
    pub fn init(config: PrimitivesConfig) -> &'static Self {
        let registry = REGISTRY.get_or_init(|| Self::new(config.clone()));
        if registry.config != config {
            warn!("Signal watch registry already initialized, ignoring new configuration");
        }
        registry
    }

    pub fn config(&self) -> &PrimitivesConfig {
        &self.config
    }

    /// Resolve `signal_name` and install `action` for it
    pub fn watch(&self, signal_name: &str, action: HandlerAction) -> PrimitiveResult<bool> {
        let signal = SignalId::from_name(signal_name)?;
        self.install(signal, action)?;
        Ok(true)
    }

    /// Install `action` for `signal`, returning the disposition it replaced
    pub fn install(&self, signal: SignalId, action: HandlerAction) -> PrimitiveResult<Disposition> {
        if !signal.can_catch() {
            return Err(PrimitiveError::Argument(format!(
                "signal {} cannot be trapped",
                signal.name()
            )));
        }
        if signal.is_reserved() {
            return Err(PrimitiveError::Argument(format!(
                "can't trap reserved signal: {}",
                signal.name()
            )));
        }

        let handler = match action {
            HandlerAction::Default => SigHandler::SigDfl,
            HandlerAction::Ignore => SigHandler::SigIgn,
            HandlerAction::Custom(_) => {
                self.ensure_dispatcher()?;
                SigHandler::Handler(trampoline)
            }
        };

        let slot = self.slot(signal);
        let mut slot = slot.lock();

        let flags = if self.config.restart_interrupted_syscalls {
            SaFlags::SA_RESTART
        } else {
            SaFlags::empty()
        };
        let new_action = SigAction::new(handler, flags, SigSet::empty());

        // SAFETY: the trampoline only touches atomics and write(2)
        let old_action = unsafe { sigaction(signal.signal(), &new_action) }
            .map_err(|errno| PrimitiveError::os("sigaction", errno))?;

        let previous = match slot.action.take() {
            Some(HandlerAction::Custom(callback)) => {
                self.retire(signal, callback);
                Disposition::Custom
            }
            Some(previous) => previous.disposition(),
            None => Disposition::from_os(old_action.handler()),
        };
        let installed = action.disposition();
        slot.action = Some(action);
        drop(slot);

        match (previous, installed) {
            (Disposition::Custom, Disposition::Custom) => {}
            (Disposition::Custom, _) => self.stats.dec_custom_handlers(),
            (_, Disposition::Custom) => self.stats.inc_custom_handlers(),
            _ => {}
        }
        self.stats.inc_installs();

        info!(
            signal = signal.name(),
            ?previous,
            ?installed,
            "Installed signal disposition"
        );
        Ok(previous)
    }

    /// Disposition installed through the registry for `signal`
    pub fn installed(&self, signal: SignalId) -> Option<Disposition> {
        self.slots.get(&signal.number()).and_then(|slot| {
            let guard = slot.lock();
            guard.action.as_ref().map(HandlerAction::disposition)
        })
    }

    /// Get registry statistics
    pub fn stats(&self) -> SignalStats {
        self.stats.snapshot()
    }

    fn slot(&self, signal: SignalId) -> Arc<Mutex<WatchSlot>> {
        self.slots
            .entry(signal.number())
            .or_insert_with(|| Arc::new(Mutex::new(WatchSlot::default())))
            .value()
            .clone()
    }

    /// Hand deliveries recorded under a replaced callback to the dispatcher
    ///
    /// Called with the signal's slot lock held and the new disposition
    /// already in place, so no later delivery is counted against `callback`.
    fn retire(&self, signal: SignalId, callback: SignalCallback) {
        let count = take_pending(signal.number());
        if count == 0 {
            return;
        }

        debug!(signal = signal.name(), count, "Retiring deliveries of replaced handler");
        match self.dispatcher.lock().as_ref() {
            Some(dispatcher) => dispatcher.retire(Retired {
                signum: signal.number(),
                callback,
                count,
            }),
            None => warn!(signal = signal.name(), count, "No dispatcher for retired deliveries"),
        }
    }

    fn ensure_dispatcher(&self) -> PrimitiveResult<()> {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_none() {
            debug!("Starting signal dispatcher");
            *dispatcher = Some(Dispatcher::spawn(
                &self.config.dispatch_thread_name,
                self.slots.clone(),
                self.stats.clone(),
            )?);
        }
        Ok(())
    }
}

/// Install `action` for the signal named `signal_name` in the process registry
pub fn watch(signal_name: &str, action: HandlerAction) -> PrimitiveResult<bool> {
    SignalWatchRegistry::global().watch(signal_name, action)
}
