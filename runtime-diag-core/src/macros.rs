use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Switches internal debug output on or off for the whole process.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Returns `true` if internal debug output is switched on.
///
/// With the `debug-logs` feature the `log` crate does the filtering, so this
/// is always `true`.
pub fn debug_enabled() -> bool {
    cfg!(feature = "debug-logs") || DEBUG.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn debug_log(args: fmt::Arguments<'_>) {
    #[cfg(feature = "debug-logs")]
    {
        log::debug!(target: "runtime_diag", "{args}");
    }
    #[cfg(not(feature = "debug-logs"))]
    {
        eprintln!("[runtime-diag] {args}");
    }
}

/// Writes internal debug output, see [`set_debug`](crate::set_debug).
#[macro_export]
#[doc(hidden)]
macro_rules! diag_debug {
    ($($arg:tt)*) => {
        if $crate::debug_enabled() {
            $crate::__debug_log(format_args!($($arg)*));
        }
    };
}
