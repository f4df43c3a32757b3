use clap::Parser;
use coldstore_report::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Loads the user event Parquet files found under an object storage prefix into an in-process
/// DuckDB table and prints the event count reports.
#[derive(Parser, Debug)]
#[command(name = "coldstore-report")]
#[command(version)]
struct Args {
    /// Path to a TOML config file. Flags and environment variables override its values.
    /// Example config:
    ///
    /// ```toml
    /// bucket = "analytics-cold-store"
    /// prefix = "topics/user_events_avro/partition=0/"
    /// cutoff_date = "2023-10-27"
    ///
    /// [storage]
    /// region = "us-east-1"
    /// ```
    #[arg(long, short, env = "COLDSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Bucket holding the event files.
    #[arg(long, short, env = "COLDSTORE_BUCKET")]
    bucket: Option<String>,

    /// Key prefix the Parquet files are listed under.
    #[arg(long, short, env = "COLDSTORE_PREFIX")]
    prefix: Option<String>,

    /// Inclusive lower bound on `timestamp` for the event type report (YYYY-MM-DD).
    #[arg(long, env = "COLDSTORE_CUTOFF")]
    cutoff: Option<String>,

    /// Read the bucket from a local directory instead of S3.
    #[arg(long, env = "COLDSTORE_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Follow the listing past its first page.
    #[arg(long, env = "COLDSTORE_ALL_PAGES")]
    all_pages: bool,

    /// Entries consulted when only the first listing page is used.
    #[arg(long, env = "COLDSTORE_PAGE_SIZE", value_parser = clap::value_parser!(u32).range(1..))]
    page_size: Option<u32>,

    /// How reports are printed: `rows` or `table`.
    #[arg(long, short, env = "COLDSTORE_FORMAT")]
    format: Option<OutputFormat>,

    /// Also write every report to this directory.
    #[arg(long, env = "COLDSTORE_EXPORT_DIR")]
    export_dir: Option<PathBuf>,

    /// Export file format: `csv`, `json` or `parquet`.
    #[arg(long, env = "COLDSTORE_EXPORT_FORMAT")]
    export_format: Option<TabularFormat>,

    /// S3 region. Falls back to AWS_REGION / AWS_DEFAULT_REGION.
    #[arg(long, env = "COLDSTORE_REGION")]
    region: Option<String>,

    /// Custom S3 endpoint, e.g. a MinIO server.
    #[arg(long, env = "COLDSTORE_ENDPOINT")]
    endpoint: Option<String>,

    /// Allow plain HTTP to the S3 endpoint.
    #[arg(long, env = "COLDSTORE_ALLOW_HTTP")]
    allow_http: bool,
}

impl Args {
    async fn into_config(self) -> anyhow::Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_toml_file(path).await?,
            None => RunnerConfig::new(),
        };

        if let Some(bucket) = self.bucket {
            config = config.with_bucket(bucket);
        }
        if let Some(prefix) = self.prefix {
            config = config.with_prefix(prefix);
        }
        if let Some(cutoff) = self.cutoff {
            config = config.with_cutoff_date(cutoff);
        }
        if self.all_pages {
            config = config.with_all_pages(true);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size as usize);
        }
        if let Some(format) = self.format {
            config = config.with_output_format(format);
        }
        if let Some(dir) = self.export_dir {
            config = config.with_export_dir(dir);
        }
        if let Some(format) = self.export_format {
            config = config.with_export_format(format);
        }

        let mut storage = config.storage().clone();
        if let Some(region) = self.region {
            storage.region = Some(region);
        }
        if let Some(endpoint) = self.endpoint {
            storage.endpoint = Some(endpoint);
        }
        if self.allow_http {
            storage.allow_http = true;
        }
        if let Some(root) = self.local_root {
            storage.local_root = Some(root);
        }
        Ok(config.with_storage(storage))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout only carries the report lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config().await?;
    let summary = Runner::new(config)?.execute().await?;

    tracing::info!(
        objects_listed = summary.objects_listed(),
        files_loaded = summary.files().len(),
        exported = summary.exported().len(),
        "Run complete"
    );
    Ok(())
}
