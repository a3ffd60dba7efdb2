//! See <https://github.com/matklad/cargo-xtask/>
//!
//! This binary defines auxiliary build commands which are not expressible
//! with just `cargo`.

use clap::Parser;

mod bundle;
mod prelude;

/// Development tasks for the entity-stack repository
#[derive(Debug, Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for entity-stack", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Build the Lambda artifacts of a synthesized assembly
    Bundle(bundle::BundleCommand),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bundle(bundle_cmd) => {
            bundle::run(bundle_cmd, cli.global).await?;
        }
    }

    Ok(())
}
