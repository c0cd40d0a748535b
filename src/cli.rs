//! Command-line interface and pipeline orchestration

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::auth;
use crate::client::{GmailSender, MailSender, SentMessage};
use crate::config::Config;
use crate::convert::BatchConverter;
use crate::error::Result;
use crate::message::{self, EncodedMessage, OutgoingMessage};

#[derive(Parser, Debug)]
#[command(name = "kindle-courier")]
#[command(version)]
#[command(about = "Convert e-books with calibre and mail them to a Kindle", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "information.json")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".kindle-courier/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with the Gmail API and cache the token
    Auth {
        /// Force re-authentication even if a token exists
        #[arg(long)]
        force: bool,
    },

    /// Convert qualifying files without sending anything
    Convert {
        /// Show what would be converted without spawning the converter
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the full convert-and-send pipeline
    Run {
        /// Plan conversions and build nothing remote
        #[arg(long)]
        dry_run: bool,

        /// Skip conversion and send whatever is already in the output directory
        #[arg(long)]
        no_convert: bool,
    },

    /// Generate an example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "information.json")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-");

        Self {
            multi: MultiProgress::new(),
            spinner_style,
            bar_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        println!("  ✓ {}", msg);
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Switches controlling which pipeline stages execute
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Plan only: no converter processes, no message, no network
    pub dry_run: bool,
    /// Skip the conversion stage entirely
    pub no_convert: bool,
    /// Whether the delivery stage runs at all (false for `convert`)
    pub deliver: bool,
}

/// Summary of one pipeline run
pub struct Report {
    pub run_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub duration_seconds: i64,
    pub dry_run: bool,
    /// Conversions that would run (dry run) or were attempted
    pub planned_conversions: usize,
    pub converted: usize,
    pub already_converted: usize,
    pub failed_conversions: Vec<(PathBuf, String)>,
    pub attachments: usize,
    /// Provider-assigned id when a message was sent
    pub message_id: Option<String>,
}

impl Report {
    fn new(run_id: String, started_at: chrono::DateTime<chrono::Utc>, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at,
            completed_at: started_at,
            duration_seconds: 0,
            dry_run,
            planned_conversions: 0,
            converted: 0,
            already_converted: 0,
            failed_conversions: Vec::new(),
            attachments: 0,
            message_id: None,
        }
    }

    fn finish(&mut self) {
        self.completed_at = chrono::Utc::now();
        self.duration_seconds = (self.completed_at - self.started_at).num_seconds();
    }
}

/// Submit the encoded message through a sender. Split out so tests can
/// drive the delivery stage with a mock.
pub async fn deliver(
    sender: &dyn MailSender,
    user_id: &str,
    message: &EncodedMessage,
) -> Result<SentMessage> {
    sender.send(user_id, message).await
}

/// Run the pipeline: convert, assemble, deliver. Stages are strictly
/// sequential; each fully completes before the next begins.
pub async fn run_pipeline(cli: &Cli, opts: PipelineOptions) -> Result<Report> {
    let reporter = ProgressReporter::new();
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut report = Report::new(run_id, chrono::Utc::now(), opts.dry_run);

    // Stage 0: configuration
    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await?;
    reporter.finish_spinner(
        &config_spinner,
        &format!(
            "Configuration loaded ({} -> {})",
            config.email, config.kindle_address
        ),
    );

    // Stage 1: batch conversion
    if !opts.no_convert {
        let converter = BatchConverter::from_config(&config.convert);
        let plan = converter.plan(&config.convert.source_dir, &config.convert.output_dir)?;
        report.planned_conversions = plan.jobs.len();
        report.already_converted = plan.skipped.len();

        if opts.dry_run {
            for job in &plan.jobs {
                let _ = reporter.multi_progress().println(format!(
                    "  would convert {} -> {}",
                    job.source.display(),
                    job.destination.display()
                ));
            }
            report.finish();
            return Ok(report);
        }

        if plan.jobs.is_empty() {
            info!("Nothing to convert, output directory is up to date");
        } else {
            let pb = reporter.add_progress_bar(plan.jobs.len() as u64, "Converting...");
            let pb_tick = pb.clone();
            let outcome = converter
                .run_with_progress(plan, move || pb_tick.inc(1))
                .await;
            pb.finish_with_message(format!(
                "Converted {} files ({} failed)",
                outcome.converted.len(),
                outcome.failed.len()
            ));

            report.converted = outcome.converted.len();
            report.failed_conversions = outcome.failed;
        }
    }

    // Stage 2: message assembly
    let attachments = message::attachments_in(&config.convert.output_dir)?;
    report.attachments = attachments.len();
    if attachments.is_empty() {
        info!("No attachments in {:?}, nothing to send", config.convert.output_dir);
        report.finish();
        return Ok(report);
    }

    if !opts.deliver {
        report.finish();
        return Ok(report);
    }

    let outgoing = OutgoingMessage::new(
        &config.email,
        &config.kindle_address,
        &config.message.subject,
        &config.message.body,
        attachments,
    );
    let encoded = outgoing.encode()?;

    // Stage 3: delivery
    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated");

    let sender = GmailSender::new(hub);
    let send_spinner = reporter.add_spinner(&format!(
        "Sending {} attachments to {}...",
        report.attachments, config.kindle_address
    ));
    let sent = deliver(&sender, &config.email, &encoded).await?;
    reporter.finish_spinner(&send_spinner, &format!("Message sent, id {}", sent.id));

    report.message_id = Some(sent.id);
    report.finish();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMailSender;
    use crate::error::CourierError;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn test_cli_assertions() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["kindle-courier", "run"]);
        assert_eq!(cli.config, PathBuf::from("information.json"));
        assert_eq!(cli.credentials, PathBuf::from("credentials.json"));
        assert_eq!(cli.token_cache, PathBuf::from(".kindle-courier/token.json"));
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Run {
                dry_run: false,
                no_convert: false
            }
        ));
    }

    #[tokio::test]
    async fn test_deliver_uses_sender() {
        let mut sender = MockMailSender::new();
        sender
            .expect_send()
            .withf(|user, _| user == "sender@gmail.com")
            .times(1)
            .returning(|_, _| {
                Ok(SentMessage {
                    id: "id-1".to_string(),
                    thread_id: None,
                })
            });

        let encoded = EncodedMessage {
            raw: "cGF5bG9hZA==".to_string(),
        };
        let sent = deliver(&sender, "sender@gmail.com", &encoded).await.unwrap();
        assert_eq!(sent.id, "id-1");
    }

    async fn write_config(dir: &std::path::Path, source: &str, output: &str) -> PathBuf {
        let path = dir.join("information.json");
        let json = serde_json::json!({
            "email": "sender@gmail.com",
            "kindle-address": "reader@kindle.com",
            "convert": {
                "source_dir": source,
                "output_dir": output,
                "command": "cp",
                "exclude": ["sub"]
            }
        });
        tokio::fs::write(&path, json.to_string()).await.unwrap();
        path
    }

    fn cli_for(config: PathBuf) -> Cli {
        Cli {
            config,
            credentials: PathBuf::from("credentials.json"),
            token_cache: PathBuf::from("token.json"),
            verbose: false,
            command: Commands::Run {
                dry_run: false,
                no_convert: false,
            },
        }
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_converting() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("epubs");
        let out = dir.path().join("mobis");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("a.epub"), b"a").unwrap();
        std::fs::write(src.join("b.epub"), b"b").unwrap();
        std::fs::write(src.join("sub").join("a.epub"), b"a2").unwrap();

        let config = write_config(
            dir.path(),
            src.to_str().unwrap(),
            out.to_str().unwrap(),
        )
        .await;

        let report = run_pipeline(
            &cli_for(config),
            PipelineOptions {
                dry_run: true,
                no_convert: false,
                deliver: true,
            },
        )
        .await
        .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.planned_conversions, 2);
        assert_eq!(report.converted, 0);
        assert!(report.message_id.is_none());
        // No converter process ran
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_only_pipeline() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("epubs");
        let out = dir.path().join("mobis");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.epub"), b"a").unwrap();

        let config = write_config(
            dir.path(),
            src.to_str().unwrap(),
            out.to_str().unwrap(),
        )
        .await;

        let report = run_pipeline(
            &cli_for(config),
            PipelineOptions {
                dry_run: false,
                no_convert: false,
                deliver: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(report.attachments, 1);
        assert!(report.message_id.is_none());
        assert!(out.join("a.mobi").exists());
    }

    #[tokio::test]
    async fn test_empty_output_directory_skips_delivery() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("epubs");
        let out = dir.path().join("mobis");
        std::fs::create_dir_all(&src).unwrap();

        let config = write_config(
            dir.path(),
            src.to_str().unwrap(),
            out.to_str().unwrap(),
        )
        .await;

        // deliver: true, but with zero attachments the pipeline stops
        // before authentication, so no credentials are needed here
        let report = run_pipeline(
            &cli_for(config),
            PipelineOptions {
                dry_run: false,
                no_convert: false,
                deliver: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.attachments, 0);
        assert!(report.message_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_kindle_address_fails_before_network() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("information.json");
        tokio::fs::write(&config, r#"{"email": "sender@gmail.com"}"#)
            .await
            .unwrap();

        let result = run_pipeline(
            &cli_for(config),
            PipelineOptions {
                dry_run: false,
                no_convert: true,
                deliver: true,
            },
        )
        .await;

        match result {
            Err(CourierError::ConfigError(msg)) => assert!(msg.contains("kindle-address")),
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }
}
