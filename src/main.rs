use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use downinthedm::agent::AgentRunner;
use downinthedm::{cli, monitor, workflow, ConfigManager};

#[derive(Parser)]
#[command(
    name = "downinthedm",
    about = "Check your Instagram DMs through a real browser",
    version
)]
struct Cli {
    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Leave the browser open after the run until Enter is pressed
    #[arg(long)]
    keep_open: bool,

    /// Verbose tracing output
    #[arg(long)]
    debug: bool,

    /// Skip the banner
    #[arg(long, short)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run once and notify if the unread count grew since last run
    Monitor,
    /// Hand the Instagram tools to an LLM agent for one task
    Agent {
        /// What the agent should do, in plain language
        task: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("downinthedm=debug")),
            )
            .init();
    }

    if !args.quiet {
        cli::print_banner();
    }

    let mut config = ConfigManager::new().load();
    if args.headless {
        config.browser.headless = true;
    }

    let result = match args.command {
        None => workflow::run(&config, args.keep_open).await.map(|_| ()),
        Some(Commands::Monitor) => monitor::check_once(&config).await,
        Some(Commands::Agent { task }) => run_agent(config, &task).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    println!("{}", rendered);
                    Ok(())
                }
                Err(e) => Err(downinthedm::DmError::Config(e.to_string())),
            }
        }
    };

    if let Err(e) = result {
        cli::print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run_agent(
    config: downinthedm::DmConfig,
    task: &str,
) -> downinthedm::Result<()> {
    let mut runner = AgentRunner::new(config)?;
    let answer = runner.run_task(task).await;
    runner.shutdown().await?;

    cli::print_section("Agent response");
    println!("{}", answer?);
    Ok(())
}
