//! Log output for binaries and tests
//!
//! The library only emits through the `log` facade. With the `debug` feature
//! enabled, [`init`] installs `env_logger`, filtered by `RUST_LOG`.

#[cfg(feature = "debug")]
fn builder() -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder
}

/// Install the env_logger backend. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init() {
    let _ = builder().try_init();
}

/// No-op without the `debug` feature
#[cfg(not(feature = "debug"))]
pub fn init() {}
