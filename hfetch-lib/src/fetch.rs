use crate::builds::{BuildDownload, BuildQuery, BuildSource, DailyBuild};
use crate::checksum::verify_md5;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBuild {
    pub build: DailyBuild,
    pub download: BuildDownload,
    pub path: PathBuf,
    pub bytes: u64,
}

pub async fn list_daily_builds<S: BuildSource>(
    source: &S,
    query: &BuildQuery,
) -> Result<Vec<DailyBuild>> {
    source
        .daily_builds(query)
        .await
        .with_context(|| format!("Failed to list daily builds of {}", query))
}

/// Downloads the most recent daily build matching `query` into `output` and
/// verifies its checksum.
pub async fn fetch_latest_build<S: BuildSource>(
    source: &S,
    query: &BuildQuery,
    output: &Path,
) -> Result<FetchedBuild> {
    // 1. Find the latest build
    let build = list_daily_builds(source, query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No daily builds found for {}", query))?;
    tracing::debug!("Latest daily build: {}", build);

    // 2. Resolve its download
    let download = source
        .build_download(query, &build)
        .await
        .with_context(|| format!("Failed to resolve download of build {}", build.build))?;

    // 3. Download
    let bytes = source
        .download_build(&download, output)
        .await
        .with_context(|| format!("Failed to download build {}", build.build))?;

    // 4. Verify
    verify_md5(output, &download.hash)?;

    Ok(FetchedBuild {
        build,
        download,
        path: output.to_path_buf(),
        bytes,
    })
}
