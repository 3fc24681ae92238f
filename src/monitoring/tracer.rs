/*!
 * Structured Tracing
 * Subscriber setup and per-primitive spans using the tracing crate
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, span, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - VMPRIM_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("VMPRIM_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one primitive call, logging its duration on drop
pub struct PrimitiveSpan {
    span: tracing::Span,
    start: Instant,
    primitive: &'static str,
    call_id: u64,
}

impl PrimitiveSpan {
    pub fn new(primitive: &'static str) -> Self {
        let call_id = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::DEBUG,
            "primitive",
            primitive,
            call_id,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            primitive,
            call_id,
        }
    }

    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    /// Underlying span, for instrumenting futures
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PrimitiveSpan {
    fn drop(&mut self) {
        let duration_us = self.start.elapsed().as_micros() as u64;
        self.span.record("duration_us", duration_us);
        let _entered = self.span.enter();
        debug!(
            primitive = self.primitive,
            call_id = self.call_id,
            duration_us,
            "primitive completed"
        );
    }
}
