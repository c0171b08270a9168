use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber exactly once per process. Safe to call
/// from multiple entrypoints (the binary's `main` and any integration test harness);
/// later calls after the first are no-ops.
pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    });
}
