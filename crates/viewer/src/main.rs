use tracing::{error, info};

mod app;

use app::bootstrap::{build_app, init_tracing};
use app::loop_runner::{run_viewer, ViewerError};

fn main() {
    init_tracing();
    info!("=== isomap viewer startup ===");

    if let Err(err) = build_app().map_err(ViewerError::from).and_then(run_viewer) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}
