//! Process-wide tracing setup, shared by `hof-server` and `hof-similarity-worker`.

use std::panic;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Whether the process is running with production-shaped logging (flattened
/// JSON events) or development-shaped logging (compact, human readable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Development,
    Production,
}

/// Initializes the global `tracing` subscriber for `service_name` and installs
/// a panic hook that logs the panic location and payload before unwinding.
///
/// Call this once, as early as possible in `main`. Panics if a global
/// subscriber is already installed.
pub fn init(service_name: &'static str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = match format {
            LogFormat::Development => "debug",
            LogFormat::Production => "info",
        };
        format!("{service_name}={default_level},tower_http=warn,mongodb=warn").into()
    });

    match format {
        LogFormat::Production => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init(),
        LogFormat::Development => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init(),
    }

    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        tracing::error!(target: "panic", %location, service = service_name, "panic: {payload}");
    }));
}
