//! Logging init helpers. The crate itself only ever calls the `log` facade
//! (see the `log::debug!` calls in [`crate::tree`]); wiring up a concrete
//! backend is left to the binary/test harness that links this crate.

use core::sync::atomic::{AtomicBool, Ordering};

static INIT: AtomicBool = AtomicBool::new(false);

/// Initializes the logger at `Trace` level. Idempotent — later calls are
/// no-ops once a logger has been installed.
pub fn init_logger_debug() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(true);
    }
}

/// Initializes the logger at `Error` level.
pub fn init_logger() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(false);
    }
}

#[cfg(feature = "flexi_logger")]
fn init(debug: bool) {
    let env = if debug {
        "amqp_codec=trace"
    } else {
        "amqp_codec=error"
    };
    flexi_logger::Logger::try_with_env_or_str(env)
        .expect("failed to initialize logger")
        .start()
        .expect("failed to start logger");
}

#[cfg(not(feature = "flexi_logger"))]
fn init(_debug: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logger();
        init_logger_debug();
    }
}
