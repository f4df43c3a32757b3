use crate::imports::*;
use polars::prelude::SerWriter;
use serde::Deserialize;

/*
    CONSTS:
    * DEFAULT_OUTPUT_DIRNAME - Default directory for exported report files
*/
pub const DEFAULT_OUTPUT_DIRNAME: &str = "coldstore_reports";

/*
    Types:
    * ExportSettings - Where and in which format report frames are written after a run
    * TabularFormat - Supported file formats (CSV, Parquet, JSON)
*/
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub(crate) output_path: PathBuf,
    pub(crate) format: TabularFormat,
}

// Builder methods
impl ExportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    pub fn format(&self) -> TabularFormat {
        self.format
    }

    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_format(mut self, format: TabularFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path_for(&self, report: &ReportResult) -> PathBuf {
        self.output_path
            .join(format!("{}.{}", report.name(), self.format.extension()))
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            output_path: PathBuf::from(DEFAULT_OUTPUT_DIRNAME),
            format: TabularFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    #[default]
    Csv,
    Parquet,
    Json,
}

impl TabularFormat {
    pub fn extension(&self) -> &str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Parquet => "parquet",
            TabularFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for TabularFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TabularFormat::Csv),
            "parquet" => Ok(TabularFormat::Parquet),
            "json" => Ok(TabularFormat::Json),
            other => Err(anyhow::anyhow!("Unsupported export format: {}", other)),
        }
    }
}

/// Writes every report frame to `<output_path>/<report name>.<ext>` and returns the paths written.
#[tracing::instrument(skip(settings, reports), fields(dir = %settings.output_path.display(), count = reports.len()))]
pub async fn export_reports(
    settings: &ExportSettings,
    reports: &[ReportResult],
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(&settings.output_path)
        .await
        .with_context(|| {
            format!(
                "Failed to create export directory {}",
                settings.output_path.display()
            )
        })?;

    let mut written = Vec::with_capacity(reports.len());
    for report in reports {
        let path = settings.path_for(report);
        let frame = report.frame().clone();
        let format = settings.format;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_tabular(&frame, &target, &format))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))??;
        tracing::debug!(report = report.name(), path = %path.display(), "Exported report");
        written.push(path);
    }
    Ok(written)
}

pub(crate) fn write_tabular(df: &TabularValue, path: &Path, format: &TabularFormat) -> Result<()> {
    let mut df = df.clone();
    match format {
        TabularFormat::Csv => {
            let file = std::fs::File::create(path)?;
            polars::prelude::CsvWriter::new(file)
                .finish(&mut df)
                .context("Failed to write CSV")?;
        }
        TabularFormat::Json => {
            let file = std::fs::File::create(path)?;
            polars::prelude::JsonWriter::new(file)
                .finish(&mut df)
                .context("Failed to write JSON")?;
        }
        TabularFormat::Parquet => {
            let file = std::fs::File::create(path)?;
            polars::prelude::ParquetWriter::new(file)
                .finish(&mut df)
                .context("Failed to write Parquet")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;
    use duckdb::types::Value;
    use polars::prelude::SerReader;

    fn sample_report() -> ReportResult {
        let mut buffer = RowBuffer::new(vec!["user_type".to_string(), "count_star()".to_string()]);
        buffer
            .push_row(vec![Value::Text("Free".to_string()), Value::BigInt(3)])
            .unwrap();
        let query = ReportQuery::standard(EVENTS_TABLE, "2023-10-27").remove(1);
        ReportResult::new(query, buffer.into_frame().unwrap())
    }

    #[test]
    fn test_format_parsing_and_extension() {
        assert_eq!("CSV".parse::<TabularFormat>().unwrap(), TabularFormat::Csv);
        assert_eq!(
            "parquet".parse::<TabularFormat>().unwrap().extension(),
            "parquet"
        );
        assert!("xlsx".parse::<TabularFormat>().is_err());
    }

    #[tokio::test]
    async fn test_export_writes_one_file_per_report() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new()
            .with_output_path(dir.path().join("out"))
            .with_format(TabularFormat::Csv);

        let written = export_reports(&settings, &[sample_report()]).await.unwrap();
        assert_eq!(written, vec![dir.path().join("out").join("events_by_user_type.csv")]);

        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert!(contents.starts_with("user_type,count_star()"));
        assert!(contents.contains("Free,3"));
    }

    #[tokio::test]
    async fn test_export_parquet_is_readable() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new()
            .with_output_path(dir.path().to_path_buf())
            .with_format(TabularFormat::Parquet);

        let written = export_reports(&settings, &[sample_report()]).await.unwrap();
        let file = std::fs::File::open(&written[0]).unwrap();
        let df = polars::prelude::ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 1);
    }
}
