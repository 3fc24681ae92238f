/*!
 * Wait Status Decoding
 * Pure bit-level equivalents of the POSIX W* macros
 *
 * Linux, Android and the BSD family (including macOS) share this layout:
 * - bits 0..7: terminating signal, or 0x7f when the child is stopped
 * - bit 7:     core dump flag
 * - bits 8..16: exit code, or the stop signal when stopped
 */

use crate::core::types::SignalNumber;
use serde::{Deserialize, Serialize};

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
compile_error!("wait status decoding is only defined for Linux and BSD-derived targets");

const LOW_MASK: i32 = 0x7f;
const STOPPED_MARK: i32 = 0x7f;
const CORE_FLAG: i32 = 0x80;

#[inline]
const fn low_bits(status: i32) -> i32 {
    status & LOW_MASK
}

#[inline]
const fn high_byte(status: i32) -> i32 {
    (status >> 8) & 0xff
}

/// WIFEXITED
#[inline]
pub const fn exited(status: i32) -> bool {
    low_bits(status) == 0
}

/// WEXITSTATUS
#[inline]
pub const fn exit_status(status: i32) -> i32 {
    high_byte(status)
}

/// WIFSIGNALED
#[inline]
pub const fn signaled(status: i32) -> bool {
    let low = low_bits(status);
    low != 0 && low != STOPPED_MARK
}

/// WTERMSIG
#[inline]
pub const fn term_signal(status: i32) -> SignalNumber {
    low_bits(status)
}

/// WCOREDUMP
#[inline]
pub const fn core_dumped(status: i32) -> bool {
    signaled(status) && status & CORE_FLAG != 0
}

/// WIFSTOPPED
#[inline]
pub const fn stopped(status: i32) -> bool {
    (status & 0xff) == STOPPED_MARK && !continued(status)
}

/// WSTOPSIG
#[inline]
pub const fn stop_signal(status: i32) -> SignalNumber {
    high_byte(status)
}

/// WIFCONTINUED
#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
pub const fn continued(status: i32) -> bool {
    status == 0xffff
}

/// WIFCONTINUED (BSD: stopped marker with SIGCONT as the stop signal)
#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[inline]
pub const fn continued(status: i32) -> bool {
    low_bits(status) == STOPPED_MARK && high_byte(status) == 0x13
}

/// Decoded state change of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ChildStatus {
    Exited(i32),
    Signaled(SignalNumber),
    Stopped(SignalNumber),
}

impl ChildStatus {
    /// Decode a raw wait status word
    ///
    /// Returns `None` for encodings that are none of exited, signaled or
    /// stopped (continued children).
    pub const fn decode(status: i32) -> Option<Self> {
        if exited(status) {
            Some(ChildStatus::Exited(exit_status(status)))
        } else if signaled(status) {
            Some(ChildStatus::Signaled(term_signal(status)))
        } else if stopped(status) {
            Some(ChildStatus::Stopped(stop_signal(status)))
        } else {
            None
        }
    }
}
