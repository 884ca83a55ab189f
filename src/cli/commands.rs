use clap::Subcommand;

use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Print the effective configuration as YAML
    Config,

    /// Replay the reference scenarios against in-memory fakes
    Simulate(SimulateArgs),
}
