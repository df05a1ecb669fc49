use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("tbg={level},tbg_cli={level}").into()))
        .init();
}
