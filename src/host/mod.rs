/*!
 * Host Module
 * Small host queries: user database, wall clock, CPU times
 */

mod clock;
mod user;

pub use clock::{clock_ticks, cpu_times, epoch_seconds, CpuTimes};
pub use user::user_home;
