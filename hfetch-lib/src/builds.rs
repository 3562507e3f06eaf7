use crate::config::Config;
use crate::download::download_file;
use crate::logging::spinner_style;
use crate::release_version::ReleaseVersion;
use crate::service::Service;
use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Which daily builds to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildQuery {
    pub product: String,
    pub version: ReleaseVersion,
    pub platform: String,
    pub only_production: bool,
}

impl BuildQuery {
    pub fn from_config(config: &Config, version: ReleaseVersion) -> Self {
        Self {
            product: config.product.clone(),
            version,
            platform: config.platform.clone(),
            only_production: config.only_production,
        }
    }
}

impl fmt::Display for BuildQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.product, self.version, self.platform)
    }
}

/// One entry of `download.get_daily_builds_list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyBuild {
    #[serde(deserialize_with = "string_or_number")]
    pub build: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DailyBuild {
    /// e.g. `16.0.736`
    pub fn full_version(&self) -> String {
        match &self.version {
            Some(version) => format!("{}.{}", version, self.build),
            None => self.build.clone(),
        }
    }
}

impl fmt::Display for DailyBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_version())?;
        if let Some(date) = &self.date {
            write!(f, " ({})", date)?;
        }
        if let Some(release) = &self.release {
            write!(f, " [{}]", release)?;
        }
        Ok(())
    }
}

/// Response of `download.get_daily_build_download`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildDownload {
    pub download_url: String,
    /// Hex encoded MD5 of the archive
    pub hash: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Build ids come back as strings, but tolerate plain numbers too.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a build id, found {}",
            other
        ))),
    }
}

pub trait BuildSource {
    /// Daily builds matching `query`, most recent first.
    fn daily_builds(
        &self,
        query: &BuildQuery,
    ) -> impl Future<Output = Result<Vec<DailyBuild>>> + Send;

    fn build_download(
        &self,
        query: &BuildQuery,
        build: &DailyBuild,
    ) -> impl Future<Output = Result<BuildDownload>> + Send;

    /// Streams the archive to `output_path`, returning the number of bytes written.
    fn download_build(
        &self,
        download: &BuildDownload,
        output_path: &Path,
    ) -> impl Future<Output = Result<u64>> + Send;
}

impl BuildSource for Service {
    #[instrument(skip_all)]
    async fn daily_builds(&self, query: &BuildQuery) -> Result<Vec<DailyBuild>> {
        let current_span = tracing::Span::current();
        current_span.pb_set_style(&spinner_style("{msg}")?);
        current_span.pb_set_message(&format!("Fetching daily builds of {}...", query));
        current_span.pb_set_finish_message(&format!("Fetching daily builds of {}... Done", query));

        self.function("download")
            .attr("get_daily_builds_list")
            .kwarg("only_production", query.only_production)
            .kwarg("platform", query.platform.as_str())
            .kwarg("product", query.product.as_str())
            .kwarg("version", query.version.to_string())
            .invoke_as()
            .await
    }

    #[instrument(skip_all)]
    async fn build_download(&self, query: &BuildQuery, build: &DailyBuild) -> Result<BuildDownload> {
        let current_span = tracing::Span::current();
        current_span.pb_set_style(&spinner_style("{msg}")?);
        current_span.pb_set_message(&format!("Resolving download of build {}...", build.build));
        current_span
            .pb_set_finish_message(&format!("Resolving download of build {}... Done", build.build));

        self.function("download")
            .attr("get_daily_build_download")
            .kwarg("build", build.build.as_str())
            .kwarg("platform", query.platform.as_str())
            .kwarg("product", query.product.as_str())
            .kwarg("version", query.version.to_string())
            .invoke_as()
            .await
    }

    async fn download_build(&self, download: &BuildDownload, output_path: &Path) -> Result<u64> {
        download_file(self.http_client(), &download.download_url, output_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use chrono::{Duration, Utc};
    use httpmock::prelude::*;
    use reqwest::Client;

    fn query() -> BuildQuery {
        BuildQuery {
            product: "houdini".to_string(),
            version: ReleaseVersion::new("16.0").unwrap(),
            platform: "linux".to_string(),
            only_production: true,
        }
    }

    fn service_for(endpoint_url: &str) -> Service {
        Service::with_token(
            Client::new(),
            endpoint_url,
            AccessToken::new("tok-123", Utc::now() + Duration::hours(1)),
        )
    }

    #[test]
    fn test_daily_build_accepts_numeric_id() {
        let builds: Vec<DailyBuild> = serde_json::from_value(serde_json::json!([
            {"build": 736, "version": "16.0", "date": "2017/10/01"},
            {"build": "123"}
        ]))
        .unwrap();

        assert_eq!(builds[0].build, "736");
        assert_eq!(builds[0].full_version(), "16.0.736");
        assert_eq!(builds[0].to_string(), "16.0.736 (2017/10/01)");
        assert_eq!(builds[1].build, "123");
        assert_eq!(builds[1].full_version(), "123");
    }

    #[test]
    fn test_daily_build_requires_id() {
        let result: Result<DailyBuild, _> =
            serde_json::from_value(serde_json::json!({"build": null}));
        assert!(result.is_err());
        let result: Result<DailyBuild, _> = serde_json::from_value(serde_json::json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn test_build_download_minimal() {
        let download: BuildDownload = serde_json::from_value(serde_json::json!({
            "download_url": "https://example.com/houdini.tar.gz",
            "hash": "d41d8cd98f00b204e9800998ecf8427e"
        }))
        .unwrap();
        assert_eq!(download.filename, None);
        assert_eq!(download.size, None);
    }

    #[test]
    fn test_query_from_config() {
        let config = Config {
            platform: "win64".to_string(),
            only_production: false,
            ..Config::default()
        };
        let query = BuildQuery::from_config(&config, ReleaseVersion::new("18.5").unwrap());
        assert_eq!(query.product, "houdini");
        assert_eq!(query.platform, "win64");
        assert!(!query.only_production);
        assert_eq!(query.to_string(), "houdini 18.5 (win64)");
    }

    #[tokio::test]
    async fn test_service_daily_builds() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/")
                    .header("Authorization", "Bearer tok-123")
                    .form_urlencoded_tuple(
                        "json",
                        r#"["download.get_daily_builds_list",[],{"only_production":true,"platform":"linux","product":"houdini","version":"16.0"}]"#,
                    );
                then.status(200).json_body(serde_json::json!([
                    {"build": "123", "version": "16.0"},
                    {"build": "122", "version": "16.0"}
                ]));
            })
            .await;

        let builds = service_for(&server.url("/api/"))
            .daily_builds(&query())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].build, "123");
    }

    #[tokio::test]
    async fn test_service_build_download() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/").form_urlencoded_tuple(
                    "json",
                    r#"["download.get_daily_build_download",[],{"build":"123","platform":"linux","product":"houdini","version":"16.0"}]"#,
                );
                then.status(200).json_body(serde_json::json!({
                    "download_url": "https://example.com/houdini-16.0.123.tar.gz",
                    "filename": "houdini-16.0.123-linux_x86_64_gcc4.8.tar.gz",
                    "hash": "b1946ac92492d2347c6235b4d2611184",
                    "size": 6
                }));
            })
            .await;

        let build = DailyBuild {
            build: "123".to_string(),
            date: None,
            version: None,
            platform: None,
            release: None,
            status: None,
        };
        let download = service_for(&server.url("/api/"))
            .build_download(&query(), &build)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            download.download_url,
            "https://example.com/houdini-16.0.123.tar.gz"
        );
        assert_eq!(download.hash, "b1946ac92492d2347c6235b4d2611184");
        assert_eq!(download.size, Some(6));
    }
}
