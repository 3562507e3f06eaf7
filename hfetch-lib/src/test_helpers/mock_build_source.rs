use crate::builds::{BuildDownload, BuildQuery, BuildSource, DailyBuild};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Serves a fixed list of builds and writes `archive` on download.
pub struct MockBuildSource {
    builds: Vec<String>,
    archive: Vec<u8>,
    hash: String,
    requested: Mutex<Vec<String>>,
}

impl MockBuildSource {
    pub fn new(builds: &[&str], archive: &[u8], hash: &str) -> Self {
        Self {
            builds: builds.iter().map(|b| b.to_string()).collect(),
            archive: archive.to_vec(),
            hash: hash.to_string(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Build ids passed to `build_download`, in call order.
    pub fn requested_builds(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl BuildSource for MockBuildSource {
    async fn daily_builds(&self, query: &BuildQuery) -> anyhow::Result<Vec<DailyBuild>> {
        Ok(self
            .builds
            .iter()
            .map(|build| DailyBuild {
                build: build.clone(),
                date: None,
                version: Some(query.version.to_string()),
                platform: Some(query.platform.clone()),
                release: None,
                status: None,
            })
            .collect())
    }

    async fn build_download(
        &self,
        _query: &BuildQuery,
        build: &DailyBuild,
    ) -> anyhow::Result<BuildDownload> {
        self.requested.lock().unwrap().push(build.build.clone());
        Ok(BuildDownload {
            download_url: format!("https://example.com/builds/{}.tar.gz", build.build),
            hash: self.hash.clone(),
            filename: None,
            date: None,
            size: Some(self.archive.len() as u64),
        })
    }

    async fn download_build(
        &self,
        _download: &BuildDownload,
        output_path: &Path,
    ) -> anyhow::Result<u64> {
        fs::write(output_path, &self.archive)
            .context(format!("Failed to write archive: {:?}", output_path))?;
        Ok(self.archive.len() as u64)
    }
}
