/*!
 * Host Primitive Tests
 * User lookup, clock and CPU times through the facade
 */

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use vm_primitives::{Primitives, PrimitiveError, PrimitivesConfig, WaitOutcome};

fn primitives() -> Primitives {
    Primitives::new(PrimitivesConfig::default())
}

#[test]
fn test_root_home() {
    let home = primitives().user_home("root").unwrap();
    assert!(home.is_absolute());
    assert_ne!(home, PathBuf::new());
}

#[test]
fn test_unknown_user_is_argument_error() {
    let err = primitives()
        .user_home("no-such-user-for-vmprim")
        .unwrap_err();
    assert_eq!(
        err,
        PrimitiveError::Argument("user no-such-user-for-vmprim does not exist".into())
    );
}

#[test]
fn test_time_advances_monotonically_enough() {
    let p = primitives();
    let first = p.time();
    let second = p.time();
    assert!(second >= first);
}

#[test]
fn test_times_include_reaped_children() {
    let p = primitives();
    let child = std::process::Command::new("sh")
        .arg("-c")
        .arg("i=0; while [ $i -lt 20000 ]; do i=$((i+1)); done")
        .spawn()
        .unwrap();
    let pid = child.id() as i32;

    assert_eq!(p.wait_pid(pid, false).unwrap(), WaitOutcome::Exited { pid, code: 0 });

    let times = p.times().as_array();
    assert_eq!(times.len(), 6);
    assert!(times[..4].iter().all(|t| *t >= 0.0));
    assert_eq!(&times[4..], &[0.0, 0.0]);
}

#[test]
fn test_facade_descriptor_errors() {
    let p = primitives();
    assert!(matches!(
        p.watch_signal_descriptor("USR1", "EXIT"),
        Err(PrimitiveError::Unsupported(_))
    ));
    assert!(p
        .watch_signal_descriptor("BOGUS", "IGNORE")
        .unwrap_err()
        .is_argument_error());
}
