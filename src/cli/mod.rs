pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "posterctl")]
#[command(about = "Poster Frame API administration: migrations, accounts, mapping resync and fixtures")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Create an administrator account")]
    CreateAdmin(commands::admin::CreateAdminArgs),

    #[command(about = "Reconcile mapping tables for one frame or all frames")]
    Resync(commands::resync::ResyncArgs),

    #[command(about = "Load groups, events, categories and posts from a YAML fixture")]
    Seed(commands::seed::SeedArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::CreateAdmin(args) => commands::admin::handle(args, output_format).await,
        Commands::Resync(args) => commands::resync::handle(args, output_format).await,
        Commands::Seed(args) => commands::seed::handle(args, output_format).await,
    }
}
