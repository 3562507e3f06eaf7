use anyhow::{Context, Result};
use clap::Parser;
use hfetch_lib::auth::Credentials;
use hfetch_lib::builds::BuildQuery;
use hfetch_lib::config::Config;
use hfetch_lib::fetch::{fetch_latest_build, list_daily_builds};
use hfetch_lib::release_version::ReleaseVersion;
use hfetch_lib::service::Service;
use reqwest::Client;
use std::path::PathBuf;

use crate::ui;

#[derive(Parser)]
#[command(name = "hfetch")]
#[command(about = "Download and verify the latest Houdini daily build")]
#[command(version)]
pub struct Cli {
    /// Houdini release line to download, as major.minor (e.g. 16.0, 20.5)
    #[arg(value_name = "VERSION")]
    pub release: ReleaseVersion,

    /// SideFX API client id
    #[arg(env = "HFETCH_CLIENT_ID")]
    pub client_id: String,

    /// SideFX API client secret key
    #[arg(env = "HFETCH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Read settings from this TOML file instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the archive (default: hou.tar.gz)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Platform to download the build for (default: linux)
    #[arg(long)]
    pub platform: Option<String>,

    /// Product to download (default: houdini)
    #[arg(long)]
    pub product: Option<String>,

    /// Also consider builds that are not production builds
    #[arg(long)]
    pub include_prereleases: bool,

    /// List the matching daily builds instead of downloading
    #[arg(long)]
    pub list: bool,

    /// Print debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        let query = BuildQuery::from_config(&config, self.release);
        let credentials = Credentials::new(self.client_id.as_str(), self.client_secret.as_str());

        let client = Client::builder()
            .user_agent(concat!("hfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        let service = Service::connect(client, &config, &credentials, None)
            .await
            .context("Failed to authenticate with the SideFX API")?;

        if self.list {
            let builds = list_daily_builds(&service, &query).await?;
            if builds.is_empty() {
                ui::warning(&format!("No daily builds found for {}", query));
            }
            for build in builds {
                ui::info(&build.to_string());
            }
            return Ok(());
        }

        let fetched = fetch_latest_build(&service, &query, &config.output)
            .await
            .context(format!("Failed to fetch the latest build of {}", query))?;

        ui::success(&format!(
            "Downloaded {} to {} ({} bytes, checksum verified)",
            fetched.build.full_version(),
            fetched.path.display(),
            fetched.bytes
        ));
        if let Some(filename) = &fetched.download.filename {
            ui::tip(&format!("Server-side archive name: {}", filename));
        }

        Ok(())
    }

    /// Settings from the config file, overridden by command-line flags.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(platform) = &self.platform {
            config.platform = platform.clone();
        }
        if let Some(product) = &self.product {
            config.product = product.clone();
        }
        if self.include_prereleases {
            config.only_production = false;
        }
        Ok(config)
    }
}
