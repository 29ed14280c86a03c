use env_logger::{Builder, Env};

/// Installs the global logger. Defaults to `info`, `RUST_LOG` overrides.
/// Calling it twice is harmless.
pub fn init_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
