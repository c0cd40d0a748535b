use anyhow::Result;
use clap::Parser;
use kindle_courier::cli::{self, Cli, Commands, PipelineOptions};
use kindle_courier::config::Config;
use kindle_courier::error::CourierError;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Uniform policy: any error exits non-zero
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs (better performance, FIPS support)
    // On Windows, use ring (better compatibility, no NASM/CMake required)
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kindle_courier=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kindle_courier=info,warn,error"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");

            if let Some(parent) = cli.token_cache.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            if force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            // Triggers the interactive consent flow when no valid cached
            // token exists; otherwise refreshes silently
            let _hub =
                kindle_courier::auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache)
                    .await?;

            kindle_courier::auth::secure_token_file(&cli.token_cache).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);

            Ok(())
        }

        Commands::Convert { dry_run } => {
            tracing::info!("Starting conversion run");
            if dry_run {
                println!("Running in DRY RUN mode - no files will be converted");
            }

            let report = cli::run_pipeline(
                &cli,
                PipelineOptions {
                    dry_run,
                    no_convert: false,
                    deliver: false,
                },
            )
            .await?;

            print_summary(&report);
            Ok(())
        }

        Commands::Run { dry_run, no_convert } => {
            tracing::info!("Starting full pipeline run");
            if dry_run {
                println!("Running in DRY RUN mode - no conversions, nothing will be sent");
            }
            if no_convert {
                println!("Skipping conversion - sending the output directory as-is");
            }

            let report = cli::run_pipeline(
                &cli,
                PipelineOptions {
                    dry_run,
                    no_convert,
                    deliver: !dry_run,
                },
            )
            .await?;

            print_summary(&report);
            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(CourierError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nPlease edit this file before running:");
            println!("  - email: the Gmail address used to send");
            println!("  - kindle-address: your Kindle's receive-by-email address");
            println!("  - convert.source_dir / convert.output_dir: where your e-books live");

            Ok(())
        }
    }
}

fn print_summary(report: &cli::Report) {
    println!("\n========================================");
    if report.dry_run {
        println!("Pipeline Summary (DRY RUN)");
    } else {
        println!("Pipeline Summary");
    }
    println!("========================================");
    println!("Run ID: {}", report.run_id);
    println!("Duration: {} seconds", report.duration_seconds);
    if report.dry_run {
        println!("Conversions planned: {}", report.planned_conversions);
    } else {
        println!("Files converted: {}", report.converted);
    }
    println!("Already converted: {}", report.already_converted);
    if !report.failed_conversions.is_empty() {
        println!("Conversions failed: {}", report.failed_conversions.len());
        for (path, reason) in &report.failed_conversions {
            println!("  - {}: {}", path.display(), reason);
        }
    }
    println!("Attachments: {}", report.attachments);
    match &report.message_id {
        Some(id) => println!("Message Id: {}", id),
        None => println!("Message: not sent"),
    }
    println!("========================================");
}

/// Display error with context and a hint where one helps
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(courier_err) = error.downcast_ref::<CourierError>() {
        match courier_err {
            CourierError::AuthError(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      You can download it from Google Cloud Console.");
                eprintln!("      Try running: kindle-courier auth --force");
            }
            CourierError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: kindle-courier init-config --force");
            }
            CourierError::ConverterError(_) => {
                eprintln!("\nHint: ebook-convert comes with calibre. In calibre, open");
                eprintln!("      Preferences -> Miscellaneous and install the command line tools.");
            }
            CourierError::PayloadTooLarge(_) => {
                eprintln!("\nHint: Gmail rejects oversized attachments. Send fewer files at once.");
            }
            e if e.is_transient() => {
                eprintln!("\nHint: This looks temporary. Try running the command again.");
            }
            _ => {}
        }
    }
}
