/*!
 * Host Clock
 * Wall-clock seconds and process CPU times
 */

use nix::libc;
use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeValLike;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Current time in whole seconds since the Unix epoch
pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// CPU time consumed by this process and its reaped children, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    pub children_user: f64,
    pub children_system: f64,
}

impl CpuTimes {
    /// Language-level six-slot form; the last two slots are always zero
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.user,
            self.system,
            self.children_user,
            self.children_system,
            0.0,
            0.0,
        ]
    }
}

/// Clock ticks per second, or `fallback` when sysconf cannot report it
pub fn clock_ticks(fallback: i64) -> i64 {
    // SAFETY: sysconf has no preconditions
    match unsafe { libc::sysconf(libc::_SC_CLK_TCK) } {
        hz if hz > 0 => hz as i64,
        _ => fallback,
    }
}

/// Read process CPU times with times(2), falling back to getrusage
pub fn cpu_times(fallback_ticks: i64) -> CpuTimes {
    // SAFETY: tms is plain data and times(2) only writes into it
    let mut tms: libc::tms = unsafe { std::mem::zeroed() };
    let res = unsafe { libc::times(&mut tms) };

    if res as i64 == -1 {
        warn!("times(2) failed, falling back to getrusage");
        return rusage_times();
    }

    let hz = clock_ticks(fallback_ticks) as f64;
    CpuTimes {
        user: tms.tms_utime as f64 / hz,
        system: tms.tms_stime as f64 / hz,
        children_user: tms.tms_cutime as f64 / hz,
        children_system: tms.tms_cstime as f64 / hz,
    }
}

fn rusage_times() -> CpuTimes {
    let seconds = |who: UsageWho| -> (f64, f64) {
        match getrusage(who) {
            Ok(usage) => (
                usage.user_time().num_microseconds() as f64 / 1e6,
                usage.system_time().num_microseconds() as f64 / 1e6,
            ),
            Err(errno) => {
                warn!(%errno, "getrusage failed");
                (0.0, 0.0)
            }
        }
    };

    let (user, system) = seconds(UsageWho::RUSAGE_SELF);
    let (children_user, children_system) = seconds(UsageWho::RUSAGE_CHILDREN);
    CpuTimes {
        user,
        system,
        children_user,
        children_system,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_seconds_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_seconds() > 1_577_836_800);
    }

    #[test]
    fn test_cpu_times_are_non_negative() {
        let times = cpu_times(60);
        for value in times.as_array() {
            assert!(value >= 0.0);
        }
        assert_eq!(times.as_array()[4], 0.0);
        assert_eq!(times.as_array()[5], 0.0);
    }

    #[test]
    fn test_rusage_fallback() {
        let times = rusage_times();
        assert!(times.user >= 0.0);
        assert!(times.children_system >= 0.0);
    }

    #[test]
    fn test_clock_ticks_positive() {
        assert!(clock_ticks(60) > 0);
    }
}
