use crate::logging::progress_bar_style;
use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use std::io::IsTerminal;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Percent step between progress log lines when stderr is not a terminal.
const PROGRESS_LOG_STEP: u64 = 10;

/// The percentage to log once `downloaded` of `total` bytes have arrived, if
/// a new step has been reached since `last_reported`.
fn next_milestone(downloaded: u64, total: u64, last_reported: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(downloaded) * 100 / u128::from(total)).min(100) as u64;
    let step = percent - percent % PROGRESS_LOG_STEP;
    (step > last_reported).then_some(step)
}

/// Streams `url` into `path`, overwriting it, and returns the number of bytes
/// written.
///
/// The response must declare a `Content-Length`; without one nothing is
/// written. A failed transfer leaves the partial file behind.
///
/// The progress bar is only drawn on a terminal; otherwise (CI logs) progress
/// is logged every ten percent.
#[instrument(skip_all)]
pub async fn download_file(client: &Client, url: &str, path: &Path) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    if !response.status().is_success() {
        bail!("Download failed: {}", response.status());
    }

    let Some(total_length) = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
    else {
        bail!("Download of {} did not declare a Content-Length", url);
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let current_span = tracing::Span::current();
    current_span.pb_set_style(&progress_bar_style()?);
    current_span.pb_set_length(total_length);
    current_span.pb_set_message(&format!("Downloading {}...", file_name));
    current_span.pb_set_finish_message(&format!("Downloading {}... Complete!", file_name));

    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let log_progress = !std::io::stderr().is_terminal();
    let mut last_reported = 0u64;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Download of {} interrupted", url))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        current_span.pb_set_position(downloaded);
        if log_progress {
            if let Some(step) = next_milestone(downloaded, total_length, last_reported) {
                tracing::info!("Downloading {}... {}%", file_name, step);
                last_reported = step;
            }
        }
    }

    file.flush().await?;

    if downloaded != total_length {
        tracing::warn!(
            "Received {} bytes but the server declared {}",
            downloaded,
            total_length
        );
    }
    tracing::debug!("Wrote {} bytes to {}", downloaded, path.display());
    Ok(downloaded)
}
