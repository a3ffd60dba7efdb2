use anyhow::Result;
use clap::Parser;
use entity_stack::commands::{self, AssemblyArgs};
use entity_stack_core::format_plan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Synthesize the entity API infrastructure into a cloud assembly
#[derive(Debug, Parser)]
#[command(name = "entity-stack")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct Global {
    /// Only print warnings and errors
    #[clap(long, global = true)]
    silent: bool,

    /// Enable debug logging
    #[clap(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[clap(long, global = true, env = "ENTITY_STACK_JSON_LOGS")]
    json_logs: bool,
}

impl Global {
    fn default_filter(&self) -> &'static str {
        if self.silent {
            "entity_stack=warn,entity_stack_core=warn"
        } else if self.verbose {
            "entity_stack=debug,entity_stack_core=debug"
        } else {
            "entity_stack=info"
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Write the stack templates, manifest and asset manifest
    Synth(AssemblyArgs),

    /// Show what would change against the assembly on disk
    Diff(AssemblyArgs),

    /// List stacks in deployment order
    List(AssemblyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.global.default_filter().into()),
        )
        .with(
            cli.global
                .json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.global.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    match cli.command {
        Commands::Synth(args) => {
            let written = commands::synth::run(&args)?;
            if !cli.global.silent {
                for path in written {
                    println!("{}", path.display());
                }
            }
        }
        Commands::Diff(args) => {
            for plan in commands::diff::run(&args)? {
                for line in format_plan(&plan) {
                    println!("{}", line);
                }
            }
        }
        Commands::List(args) => {
            for line in commands::list::run(&args)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
