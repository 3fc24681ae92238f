/*!
 * Monitoring
 * Structured logging setup and primitive call spans
 */

mod tracer;

pub use tracer::{init_tracing, PrimitiveSpan};
