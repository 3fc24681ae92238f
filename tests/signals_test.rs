/*!
 * Signal Watch Tests
 * Installing dispositions and delivering real signals to this process
 */

use nix::sys::signal::{raise, Signal};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use vm_primitives::signals::*;
use vm_primitives::PrimitiveError;

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

fn counting_action() -> (HandlerAction, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let action = HandlerAction::custom(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (action, hits)
}

#[test]
#[serial]
fn test_custom_handler_runs_once_then_ignore_replaces_it() {
    let registry = SignalWatchRegistry::global();
    let (action, hits) = counting_action();

    assert!(registry.watch("SIGUSR1", action).unwrap());
    raise(Signal::SIGUSR1).unwrap();
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1));

    assert!(registry.watch("SIGUSR1", HandlerAction::Ignore).unwrap());
    raise(Signal::SIGUSR1).unwrap();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn test_callback_runs_off_the_signalled_thread() {
    let registry = SignalWatchRegistry::global();
    let seen = Arc::new(parking_lot::Mutex::new(None::<String>));
    let recorder = seen.clone();

    registry
        .watch(
            "USR2",
            HandlerAction::custom(move || {
                let name = thread::current().name().map(str::to_string);
                *recorder.lock() = name;
            }),
        )
        .unwrap();
    raise(Signal::SIGUSR2).unwrap();

    assert!(wait_until(|| seen.lock().is_some()));
    assert_eq!(
        seen.lock().clone(),
        Some(registry.config().dispatch_thread_name.clone())
    );

    registry.watch("USR2", HandlerAction::Ignore).unwrap();
}

#[test]
#[serial]
fn test_unknown_signal_installs_nothing() {
    let registry = SignalWatchRegistry::global();
    let before = registry.stats().installs;

    let err = registry.watch("NOTASIGNAL", HandlerAction::Ignore).unwrap_err();
    assert!(err.is_argument_error());
    assert_eq!(
        err,
        PrimitiveError::InvalidSignal("unsupported signal 'SIGNOTASIGNAL'".into())
    );
    assert_eq!(registry.stats().installs, before);
}

#[test]
#[serial]
fn test_uncatchable_signal_is_argument_error() {
    let registry = SignalWatchRegistry::global();
    let err = registry.watch("KILL", HandlerAction::Ignore).unwrap_err();
    assert!(matches!(err, PrimitiveError::Argument(_)));
}

#[test]
#[serial]
fn test_install_reports_previous_disposition() {
    let registry = SignalWatchRegistry::global();
    let winch = SignalId::from_name("WINCH").unwrap();

    assert_eq!(
        registry.install(winch, HandlerAction::Ignore).unwrap(),
        Disposition::Default
    );
    assert_eq!(
        registry.install(winch, HandlerAction::custom(|| {})).unwrap(),
        Disposition::Ignore
    );
    assert_eq!(
        registry.install(winch, HandlerAction::Default).unwrap(),
        Disposition::Custom
    );
    assert_eq!(registry.installed(winch), Some(Disposition::Default));
}

#[test]
#[serial]
fn test_repeated_install_leaves_single_disposition() {
    let registry = SignalWatchRegistry::global();
    let hup = SignalId::from_name("SIGHUP").unwrap();
    let (action, hits) = counting_action();

    registry.install(hup, action.clone()).unwrap();
    let custom_before = registry.stats().custom_handlers;
    assert_eq!(registry.install(hup, action).unwrap(), Disposition::Custom);
    assert_eq!(registry.stats().custom_handlers, custom_before);
    assert_eq!(registry.installed(hup), Some(Disposition::Custom));

    raise(Signal::SIGHUP).unwrap();
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    registry.install(hup, HandlerAction::Ignore).unwrap();
    registry.install(hup, HandlerAction::Ignore).unwrap();
    assert_eq!(registry.installed(hup), Some(Disposition::Ignore));
}

#[test]
#[serial]
fn test_concurrent_installs_on_same_signal() {
    let registry = SignalWatchRegistry::global();
    let alrm = SignalId::from_name("ALRM").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let action = if i % 2 == 0 {
                    HandlerAction::Ignore
                } else {
                    HandlerAction::custom(|| {})
                };
                registry.install(alrm, action).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    registry.install(alrm, HandlerAction::Ignore).unwrap();
    assert_eq!(registry.installed(alrm), Some(Disposition::Ignore));
}

#[test]
#[serial]
fn test_string_action_descriptors() {
    assert!(watch("USR2", HandlerAction::from_descriptor("SIG_IGN").unwrap()).unwrap());
    assert_eq!(
        SignalWatchRegistry::global().installed(SignalId::from_name("USR2").unwrap()),
        Some(Disposition::Ignore)
    );
    assert!(matches!(
        HandlerAction::from_descriptor("EXIT"),
        Err(PrimitiveError::Unsupported(_))
    ));
}

#[test]
#[serial]
fn test_replacing_callback_keeps_undispatched_deliveries() {
    let registry = SignalWatchRegistry::global();

    for _ in 0..20 {
        let (first, first_hits) = counting_action();
        let (second, second_hits) = counting_action();

        registry.watch("USR1", first).unwrap();
        raise(Signal::SIGUSR1).unwrap();
        registry.watch("USR1", second).unwrap();

        assert!(wait_until(|| first_hits.load(Ordering::SeqCst) == 1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 0);
    }

    registry.watch("USR1", HandlerAction::Ignore).unwrap();
}

#[test]
#[serial]
fn test_ignoring_after_delivery_still_runs_callback() {
    let registry = SignalWatchRegistry::global();

    for _ in 0..20 {
        let (action, hits) = counting_action();

        registry.watch("USR2", action).unwrap();
        raise(Signal::SIGUSR2).unwrap();
        registry.watch("USR2", HandlerAction::Ignore).unwrap();

        assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1));
        raise(Signal::SIGUSR2).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

#[test]
#[serial]
fn test_reserved_signals_are_refused() {
    let registry = SignalWatchRegistry::global();
    let before = registry.stats().installs;

    for name in ["SEGV", "SIGBUS", "ILL", "FPE", "VTALRM"] {
        let err = registry
            .watch(name, HandlerAction::custom(|| {}))
            .unwrap_err();
        assert!(
            matches!(&err, PrimitiveError::Argument(msg) if msg.contains("reserved")),
            "{}: {:?}",
            name,
            err
        );
        assert!(registry.watch(name, HandlerAction::Ignore).is_err());
    }

    assert_eq!(registry.stats().installs, before);
    assert_eq!(
        registry.installed(SignalId::from_name("SEGV").unwrap()),
        None
    );
}
