//! CLI-side construction of the pipeline configuration.

use lectio_core::LiveSearchConfig;

use crate::Cli;

/// Maps command-line flags onto the engine's production defaults.
pub fn live_config(cli: &Cli) -> LiveSearchConfig {
    LiveSearchConfig {
        respect_robots: cli.respect_robots,
        ..LiveSearchConfig::default()
    }
}
