//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// `default_filter` applies when `RUST_LOG` is unset. Calling this more than
/// once is harmless; later calls leave the first logger in place.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::trace!("logger already initialized");
    }
}

/// Initialize logging for tests, capturing output per test
#[cfg(test)]
pub fn init_test() {
    let _ = env_logger::builder().is_test(true).try_init();
}
