//! Kindle Courier
//!
//! Batch-converts e-books with an external converter (calibre's
//! `ebook-convert`) and mails the results to a Kindle address through the
//! Gmail API, authenticating with an OAuth2 installed-app flow.
//!
//! # Overview
//!
//! Three strictly sequential stages:
//! - **Conversion**: walk a source tree, skip excluded subtrees, convert
//!   every qualifying file into a flat output directory (idempotent: files
//!   whose destination already exists are not re-converted)
//! - **Message assembly**: build one multipart MIME message with every file
//!   in the output directory attached, encoded as a single raw payload
//! - **Delivery**: submit the message under the authenticated account and
//!   report the provider-assigned message id
//!
//! # Example Usage
//!
//! ```no_run
//! use kindle_courier::{auth, client::{GmailSender, MailSender}, config::Config,
//!                      convert::BatchConverter, message};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("information.json".as_ref()).await?;
//!
//!     let converter = BatchConverter::from_config(&config.convert);
//!     let plan = converter.plan(&config.convert.source_dir, &config.convert.output_dir)?;
//!     let outcome = converter.run(plan).await;
//!     println!("converted {} files", outcome.converted.len());
//!
//!     let attachments = message::attachments_in(&config.convert.output_dir)?;
//!     let encoded = message::OutgoingMessage::new(
//!         &config.email,
//!         &config.kindle_address,
//!         &config.message.subject,
//!         &config.message.body,
//!         attachments,
//!     )
//!     .encode()?;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".kindle-courier/token.json".as_ref(),
//!     )
//!     .await?;
//!     let sent = GmailSender::new(hub).send(&config.email, &encoded).await?;
//!     println!("Message Id: {}", sent.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`cli`] - Command-line interface and pipeline orchestration
//! - [`client`] - Gmail delivery client behind the [`client::MailSender`] seam
//! - [`config`] - Configuration management
//! - [`convert`] - Batch conversion through the external converter
//! - [`error`] - Error types and result aliases
//! - [`exclude`] - Substring-based directory exclusion
//! - [`message`] - MIME multipart assembly and raw-payload encoding

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod exclude;
pub mod message;

// Re-export commonly used types for convenience
pub use error::{CourierError, Result};

pub use config::{Config, ConvertConfig, MessageConfig};

pub use convert::{BatchConverter, ConversionJob, ConversionPlan, ConversionReport};

pub use exclude::ExclusionSet;

pub use message::{EncodedMessage, OutgoingMessage};

pub use client::{GmailSender, MailSender, SentMessage};

pub use cli::{Cli, Commands, PipelineOptions, ProgressReporter, Report};
