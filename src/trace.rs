//! Span and event macros that compile away without the `tracing` feature.
//!
//! Pipeline stages instrument themselves through `trace_span!` and
//! `trace_event!` instead of calling `tracing` directly, so the default
//! build carries no tracing machinery at all. Spans mark one pipeline run
//! (assess, enhance, extract, compare, evaluate); events record the scores
//! and decisions produced inside it as key/value fields.

/// Info-level span around one pipeline operation.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::DisabledSpan
    };
}

/// Info-level event with key/value measurement fields.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        // Field expressions still evaluate in disabled builds.
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Span stand-in for disabled builds; `entered` keeps call sites uniform
/// with `tracing::Span`.
#[cfg(not(feature = "tracing"))]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
