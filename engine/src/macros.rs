//! Custom macros for reducing code repetition in the engine

/// Log an error and continue execution (non-fatal error handling)
///
/// # Example
/// ```ignore
/// log_and_continue!(screen.present(), "present movie frame");
/// ```
#[macro_export]
macro_rules! log_and_continue {
    ($expr:expr, $context:expr) => {
        if let Err(e) = $expr {
            log::error!("Failed to {}: {}", $context, e);
        }
    };
}

/// Log a warning once per flag, used for per-session degradations
///
/// # Example
/// ```ignore
/// warn_once!(self.incompatible, "Alpha mask does not match frame");
/// ```
#[macro_export]
macro_rules! warn_once {
    ($flag:expr, $($arg:tt)+) => {
        if !$flag {
            $flag = true;
            log::warn!($($arg)+);
        }
    };
}

/// Validate an enum-like string value
///
/// # Example
/// ```ignore
/// validate_enum!(level, "trace", "debug", "info", "warn", "error");
/// ```
#[macro_export]
macro_rules! validate_enum {
    ($value:expr, $($variant:literal),+) => {
        match $value {
            $($variant)|+ => Ok(()),
            _ => anyhow::bail!("Invalid value: {} (expected one of: {})", $value, [$($variant),+].join(", ")),
        }
    };
}
