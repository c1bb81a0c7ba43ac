mod gen;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "netpolicyctl", about = "Generate network states from capture policies.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a network state from a policy file.
    Gen(gen::GenArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Gen(args) => gen::run(args),
    }
}
