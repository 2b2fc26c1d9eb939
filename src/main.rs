use anyhow::Result;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubescribe::cli::Cli;
use tubescribe::config::Config;
use tubescribe::transcribe::{RunOutcome, SubtitlePipeline};
use tubescribe::utils;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubescribe=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("❌ Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Credentials first, before anything touches the network
    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let url = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        cli.resolve_url(&mut input, &mut std::io::stdout())?
    };
    let Some(url) = url else {
        eprintln!("{}", style("❌ No URL provided.").red());
        return Ok(ExitCode::FAILURE);
    };

    // Check for required external dependencies (non-fatal, the download step reports real failures)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
    }

    let pipeline = SubtitlePipeline::from_config(&config, std::env::current_dir()?)?;

    tracing::info!("Starting subtitle generation for URL: {}", url);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match pipeline.run(&url, interrupt).await {
        Ok(RunOutcome::Completed(_)) => {
            println!("\n✨ All done!");
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::Cancelled) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!(
                "\n{} {} stage failed: {}",
                style("❌").red(),
                e.stage(),
                e
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
