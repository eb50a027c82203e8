//! ---
//! cs_section: "03-logging"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Structured logging macros carrying primitive context."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __cs_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext<'_> = &$ctx;
        tracing::event!(
            $level,
            primitive = ctx.primitive.unwrap_or(""),
            shadow = ctx.shadow.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with primitive context.
#[macro_export]
macro_rules! cs_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with primitive context.
#[macro_export]
macro_rules! cs_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with primitive context.
#[macro_export]
macro_rules! cs_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with primitive context.
#[macro_export]
macro_rules! cs_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cs_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
