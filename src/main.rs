use log::info;

use bankload::gateway::paths;
use bankload::{LoadRunner, Result};

mod app_config;

use app_config::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Run(args) => {
            let config = args.into_config()?;
            let runner = LoadRunner::new(config)?;
            let report = runner.run().await?;

            println!();
            println!("{}", report.format_table());
            info!(
                "run {} finished: {} requests, {} failures",
                report.run_id, report.total_requests, report.total_failures
            );
        }

        Commands::Endpoints => {
            println!("Gateway endpoints driven by the load test:");
            println!("  POST {}", paths::LOGIN);
            println!("  GET  {}", paths::PROFILE);
            println!("  POST {}", paths::CUSTOMER_CREATE);
            println!("  GET  {}?page=&size=", paths::CUSTOMER_LIST);
            println!("  GET  {}/{{customerId}}", paths::CUSTOMER_GET);
            println!("  GET  {}/{{customerId}}", paths::ACCOUNT_FIND);
            println!("  POST {}", paths::ACCOUNT_CREATE);
            println!("  GET  {}/{{accountId}}", paths::ACCOUNT_GET);
            println!("  GET  {}?accountId=&page=&size=", paths::ACCOUNT_OPERATIONS);
            println!("  POST {}", paths::ACCOUNT_CREDIT);
        }
    }

    Ok(())
}
