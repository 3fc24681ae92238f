/*!
 * Control Module
 * Tagged non-local control transfer (catch/throw)
 */

mod escape;
mod tag;

pub use escape::{catch, catch_fresh, throw, Completion, Escape, Unwind};
pub use tag::Tag;
