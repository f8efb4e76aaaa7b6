use clap::Parser;
use dashboard_ingest::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    // Dropping the command future discards in-flight parse workers
    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    eprintln!("\nReceived CTRL+C, stopping...");
                    Err(anyhow::anyhow!("interrupted by user"))
                }
                Err(e) => Err(anyhow::anyhow!("failed to listen for CTRL+C: {}", e)),
            },
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Dashboard Ingest - large dataset cache for the sales dashboard");
    println!("==============================================================");
    println!();
    println!("USAGE:");
    println!("    dashboard-ingest <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    load        Load datasets, serving the cache when it is still fresh");
    println!("    refetch     Download and re-parse regardless of cache freshness");
    println!("    clear       Empty the persistent cache");
    println!("    status      Show what the cache holds");
    println!();
    println!("EXAMPLES:");
    println!("    dashboard-ingest load --dataset bar --max-age 30");
    println!("    dashboard-ingest refetch --dataset ticket-sales");
    println!("    dashboard-ingest status --format json");
    println!();
    println!("For detailed help on any command, use:");
    println!("    dashboard-ingest <COMMAND> --help");
}
