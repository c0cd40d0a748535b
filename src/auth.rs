//! OAuth2 authentication for the Gmail send API
//!
//! First run: the installed-app consent flow opens a browser and blocks on
//! user authorization, then the resulting token is persisted to the cache
//! file. Later runs load the cached token and yup-oauth2 silently refreshes
//! it when expired, re-persisting the refreshed token to disk.

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::Path;

use crate::error::{CourierError, Result};

/// The only scope this tool needs: sending mail as the authenticated user
pub const SEND_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.send"];

/// Type alias for the Gmail hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize the Gmail API hub with OAuth2 authentication.
///
/// * `credentials_path` - OAuth2 client-secret JSON (from Google Cloud Console)
/// * `token_cache_path` - where access/refresh tokens are persisted
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| CourierError::AuthError(format!("Failed to read credentials: {}", e)))?;

    // HTTPRedirect opens a browser for user authorization on first use
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| CourierError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Pre-fetch a token so consent (or refresh) happens here, before any
    // conversion work or message assembly depends on a valid credential
    let _token = auth
        .token(SEND_SCOPES)
        .await
        .map_err(|e| CourierError::AuthError(format!("Failed to obtain token: {}", e)))?;

    // HTTP/1 for compatibility with google-gmail1
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| CourierError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Secure token file permissions on Unix systems
///
/// Sets file permissions to 0600 (read/write for owner only)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Secure token file on Windows (stub implementation)
///
/// Windows uses ACLs instead of Unix permissions
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
