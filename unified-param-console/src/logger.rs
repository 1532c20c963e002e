use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr so stdout stays clean for parameter output.
/// `RUST_LOG` takes precedence over the `--debug` default.
pub fn init_logger(json_mode: bool, debug: bool) {
    let default = if debug {
        "unified_param=debug,unified_param_console=debug"
    } else {
        "unified_param=warn,unified_param_console=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json_mode {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}
