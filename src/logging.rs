//! Logging abstraction layer.
//!
//! The engine never talks to a logging backend directly. All diagnostics go
//! through the per-level macros below, which expand through a single hidden
//! dispatcher (`__dispatch_log!`) into whichever backend feature is enabled.
//! The two backends are **mutually exclusive** — enable at most one.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! With neither feature enabled every macro expands to nothing and the
//! format arguments are never evaluated.
//!
//! What the engine logs at each level:
//!
//! - `trace_log!` — resolver walks and cache probes.
//! - `debug_log!` — intent application, guard verdicts, spam-filter drops.
//! - `info_log!` — committed transactions, engine init/reset, pended
//!   navigations.
//! - `warn_log!` — dropped navigations, safety-timer trips.
//! - `error_log!` — failed follow-up batches and other recoverable faults.
//!
//! All macros take `format!`-style arguments:
//!
//! ```ignore
//! use navigator_core::{debug_log, warn_log};
//!
//! debug_log!("Guard '{}' returned {:?}", name, outcome);
//! warn_log!("Safety timeout tripped, resetting transition state");
//! ```

/// Backend dispatcher behind the per-level macros. Takes the level as a
/// bare identifier (`trace`, `debug`, …) matching the backend macro names.
#[doc(hidden)]
#[macro_export]
macro_rules! __dispatch_log {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)+);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)+);
    }};
}

/// Emit a **trace**-level message (finest-grained diagnostics).
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)+) => {
        $crate::__dispatch_log!(trace, $($arg)+)
    };
}

/// Emit a **debug**-level message (information useful when debugging).
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)+) => {
        $crate::__dispatch_log!(debug, $($arg)+)
    };
}

/// Emit an **info**-level message (notable state changes).
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)+) => {
        $crate::__dispatch_log!(info, $($arg)+)
    };
}

/// Emit a **warn**-level message (something off, engine continues).
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)+) => {
        $crate::__dispatch_log!(warn, $($arg)+)
    };
}

/// Emit an **error**-level message (a fault the engine recovered from).
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)+) => {
        $crate::__dispatch_log!(error, $($arg)+)
    };
}
