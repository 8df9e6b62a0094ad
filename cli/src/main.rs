//! The `podconfig` command line entrypoint.

use anyhow::Result;

fn run() -> Result<()> {
    podconfig_utils::initialize_tracing();
    tracing::trace!("starting");
    podconfig_lib::cli::run_from_iter(std::env::args())
}

fn main() {
    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
