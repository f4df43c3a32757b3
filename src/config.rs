use crate::imports::*;
use regex::Regex;
use serde::Deserialize;

/*
    CONSTS:
    * DEFAULT_BUCKET / DEFAULT_PREFIX / DEFAULT_CUTOFF_DATE - Values the runner uses when nothing else is configured
    * DEFAULT_PAGE_SIZE - Entries returned by a single S3 ListObjectsV2 call
*/
pub const DEFAULT_BUCKET: &str = "analytics-cold-store";
pub const DEFAULT_PREFIX: &str = "topics/user_events_avro/partition=0/";
pub const DEFAULT_CUTOFF_DATE: &str = "2023-10-27";
pub const DEFAULT_PAGE_SIZE: usize = 1000;

// Dates are embedded into SQL, so only plain date / datetime literals are accepted.
static CUTOFF_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}([ T]\d{2}:\d{2}(:\d{2})?)?$"));

/*
    Types:
    * RunnerConfig - Startup parameters of a run (bucket, prefix, cutoff date) plus storage and output options
    * StorageSettings - Credentials / endpoint overrides for S3, or a local root directory
    * OutputFormat - How reports are written to the ReportIO sinks
*/
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub(crate) bucket: String,
    pub(crate) prefix: String,
    pub(crate) cutoff_date: String,
    pub(crate) all_pages: bool,
    pub(crate) page_size: usize,
    pub(crate) output_format: OutputFormat,
    pub(crate) export_dir: Option<PathBuf>,
    pub(crate) export_format: TabularFormat,
    pub(crate) storage: StorageSettings,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            cutoff_date: DEFAULT_CUTOFF_DATE.to_string(),
            all_pages: false,
            page_size: DEFAULT_PAGE_SIZE,
            output_format: OutputFormat::Rows,
            export_dir: None,
            export_format: TabularFormat::Csv,
            storage: StorageSettings::default(),
        }
    }
}

// Builder methods
impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse runner configuration")
    }

    pub async fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn cutoff_date(&self) -> &str {
        &self.cutoff_date
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub fn listing_mode(&self) -> ListingMode {
        if self.all_pages {
            ListingMode::AllPages
        } else {
            ListingMode::FirstPage {
                page_size: self.page_size,
            }
        }
    }

    pub fn export_settings(&self) -> Option<ExportSettings> {
        self.export_dir.as_ref().map(|dir| {
            ExportSettings::new()
                .with_output_path(dir.clone())
                .with_format(self.export_format)
        })
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_cutoff_date(mut self, cutoff_date: impl Into<String>) -> Self {
        self.cutoff_date = cutoff_date.into();
        self
    }

    pub fn with_all_pages(mut self, all_pages: bool) -> Self {
        self.all_pages = all_pages;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_export(self, dir: PathBuf, format: TabularFormat) -> Self {
        self.with_export_dir(dir).with_export_format(format)
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = Some(dir);
        self
    }

    pub fn with_export_format(mut self, format: TabularFormat) -> Self {
        self.export_format = format;
        self
    }

    pub fn with_storage(mut self, storage: StorageSettings) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_local_root(mut self, root: PathBuf) -> Self {
        self.storage.local_root = Some(root);
        self
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, prefix = %self.prefix))]
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(IngestError::InvalidConfig("bucket must not be empty".to_string()).into());
        }
        if self.prefix.trim().is_empty() {
            return Err(IngestError::InvalidConfig("prefix must not be empty".to_string()).into());
        }
        if self.page_size == 0 {
            return Err(
                IngestError::InvalidConfig("page_size must be greater than 0".to_string()).into(),
            );
        }
        let pattern = CUTOFF_PATTERN
            .as_ref()
            .map_err(|e| anyhow::anyhow!("Invalid cutoff date pattern: {}", e))?;
        if !pattern.is_match(&self.cutoff_date) {
            tracing::warn!(cutoff_date = %self.cutoff_date, "Rejected cutoff date");
            return Err(IngestError::InvalidConfig(format!(
                "cutoff_date '{}' is not a YYYY-MM-DD date",
                self.cutoff_date
            ))
            .into());
        }
        tracing::debug!("Runner configuration is valid");
        Ok(())
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub allow_http: bool,
    pub local_root: Option<PathBuf>,
}

// Credentials stay out of logs.
impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("has_credentials", &self.has_credentials())
            .field("allow_http", &self.allow_http)
            .field("local_root", &self.local_root)
            .finish()
    }
}

impl StorageSettings {
    pub fn is_local(&self) -> bool {
        self.local_root.is_some()
    }

    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Rows,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rows" => Ok(OutputFormat::Rows),
            "table" => Ok(OutputFormat::Table),
            other => Err(anyhow::anyhow!(
                "Unsupported output format '{}', expected 'rows' or 'table'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;

    #[test]
    fn test_defaults_point_at_cold_store() {
        let config = RunnerConfig::default();
        assert_eq!(config.bucket(), "analytics-cold-store");
        assert_eq!(config.prefix(), "topics/user_events_avro/partition=0/");
        assert_eq!(config.cutoff_date(), "2023-10-27");
        assert_eq!(
            config.listing_mode(),
            ListingMode::FirstPage { page_size: 1000 }
        );
        assert!(config.export_settings().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        init_tracing();
        let config = RunnerConfig::from_toml_str(
            r#"
            bucket = "other-bucket"
            cutoff_date = "2024-01-01"
            all_pages = true
            output_format = "table"

            [storage]
            region = "eu-west-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.bucket(), "other-bucket");
        assert_eq!(config.prefix(), DEFAULT_PREFIX);
        assert_eq!(config.cutoff_date(), "2024-01-01");
        assert_eq!(config.listing_mode(), ListingMode::AllPages);
        assert_eq!(config.output_format(), OutputFormat::Table);
        assert_eq!(config.storage().region.as_deref(), Some("eu-west-1"));
        assert!(!config.storage().is_local());
    }

    #[test]
    fn test_validate_rejects_empty_bucket_and_prefix() {
        init_tracing();
        let err = RunnerConfig::new().with_bucket("").validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::InvalidConfig(_))
        ));

        let err = RunnerConfig::new().with_prefix("  ").validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_cutoff_date() {
        init_tracing();
        for ok in ["2023-10-27", "2023-10-27 08:30", "2023-10-27T08:30:00"] {
            assert!(
                RunnerConfig::new().with_cutoff_date(ok).validate().is_ok(),
                "{ok} should be accepted"
            );
        }
        for bad in ["27/10/2023", "2023-10-27'; DROP TABLE user_events; --", ""] {
            assert!(
                RunnerConfig::new().with_cutoff_date(bad).validate().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_storage_debug_hides_secrets() {
        let storage = StorageSettings {
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", storage);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("AKIAEXAMPLE"));
        assert!(rendered.contains("has_credentials: true"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("rows".parse::<OutputFormat>().unwrap(), OutputFormat::Rows);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
