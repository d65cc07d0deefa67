use avgflow_app::app::{run, AppConfig};
use avgflow_core::boundary::install_panic_logging;

fn main() {
    tracing_subscriber::fmt::init();
    install_panic_logging();
    let config = AppConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "invalid configuration, falling back to defaults");
        AppConfig::default()
    });
    if let Err(err) = run(config) {
        eprintln!("Failed to start AVGFlow: {err:#}");
    }
}
