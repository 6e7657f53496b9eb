//! Logging bootstrap
//!
//! Engine code logs through the `log` facade with a `bee::<area>` target.
//! `RUST_LOG` overrides the default filter, e.g. `RUST_LOG=bee::particles=debug`.

/// Install the process logger. Later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

/// Logger for unit tests: captured by the test harness, safe to call repeatedly
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_for_tests();
        init_for_tests();
        init();
        log::debug!(target: "bee::runtime", "logger ready");
    }
}
