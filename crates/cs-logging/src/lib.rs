//! ---
//! cs_section: "03-logging"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Structured logging adapters and sinks."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging context shared by the reconciler crates.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for interactive use.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Primitive (or promotion wrapper) the event concerns.
    pub primitive: Option<&'a str>,
    /// Target configuration shadow, when one is in play.
    pub shadow: Option<&'a str>,
    /// Lifecycle operation being carried out (`flush`, `destroy`, ...).
    pub operation: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a primitive name.
    pub fn with_primitive(mut self, primitive: &'a str) -> Self {
        self.primitive = Some(primitive);
        self
    }

    /// Attach a configuration shadow name.
    pub fn with_shadow(mut self, shadow: Option<&'a str>) -> Self {
        self.shadow = shadow;
        self
    }

    /// Attach an operation descriptor.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.copied().unwrap_or_default();
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            primitive = ctx.primitive.unwrap_or(""),
            shadow = ctx.shadow.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            primitive = ctx.primitive.unwrap_or(""),
            shadow = ctx.shadow.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_primitive("web1")
            .with_operation("flush");
        cs_info!(context = ctx, "primitive flushed");
        cs_debug!("debug message");
        cs_warn!(context = ctx.with_shadow(Some("staging")), "retrying {}", 1);
        cs_error!(context = ctx, "exit status: {}", 42);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_primitive("web1");
        log_system_event(
            Some(&ctx),
            "primitive.destroy",
            "primitive removed",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "primitive.destroy",
            "stop failed",
            SystemEventOutcome::Fault,
        );
    }
}
