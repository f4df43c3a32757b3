/*
    Runner lifecycle:
    * Runner<Configured> - validated configuration plus the object store to enumerate
    * Runner<Enumerated> - at least one Parquet file was found, no engine session exists yet
    * Runner<Loaded> - every file is in the events table of a live engine session
    * Runner<Completed> - the three reports were printed, the session is closed

    Every transition consumes the previous state, so a run can only move forward and a failed
    step drops whatever session it held.
*/
use crate::imports::*;

mod enumerate;
mod load;
mod report;


pub struct Configured {
    enumerator: ObjectEnumerator,
}

pub struct Enumerated {
    enumerator: ObjectEnumerator,
    listing: Listing,
}

pub struct Loaded {
    session: EngineSession,
    objects_listed: usize,
    files: Vec<ParquetFile>,
}

pub struct Completed {
    summary: RunSummary,
}

pub struct Runner<S> {
    config: RunnerConfig,
    services: RunnerServices,
    state: S,
}

impl<S> Runner<S> {
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn services(&self) -> &RunnerServices {
        &self.services
    }
}

impl Runner<Configured> {
    /// Validates the configuration and builds the object store it points at.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        let enumerator = ObjectEnumerator::from_config(&config)?;
        Ok(Self::with_enumerator(config, enumerator))
    }

    pub fn from_enumerator(config: RunnerConfig, enumerator: ObjectEnumerator) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_enumerator(config, enumerator))
    }

    fn with_enumerator(config: RunnerConfig, enumerator: ObjectEnumerator) -> Self {
        Runner {
            config,
            services: RunnerServices::defaults(),
            state: Configured { enumerator },
        }
    }

    pub fn with_services(mut self, services: RunnerServices) -> Self {
        self.services = services;
        self
    }

    pub fn enumerator(&self) -> &ObjectEnumerator {
        &self.state.enumerator
    }

    /// Runs every step and returns what the run produced.
    pub async fn execute(self) -> Result<RunSummary> {
        let completed = self.enumerate().await?.load().await?.report().await?;
        Ok(completed.into_summary())
    }
}

impl Runner<Enumerated> {
    pub fn files(&self) -> &[ParquetFile] {
        &self.state.listing.files
    }

    pub fn listing(&self) -> &Listing {
        &self.state.listing
    }
}

impl Runner<Loaded> {
    pub fn files(&self) -> &[ParquetFile] {
        &self.state.files
    }

    pub fn session(&self) -> &EngineSession {
        &self.state.session
    }
}

impl Runner<Completed> {
    pub fn summary(&self) -> &RunSummary {
        &self.state.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.state.summary
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub(crate) objects_listed: usize,
    pub(crate) files: Vec<ParquetFile>,
    pub(crate) statements_executed: usize,
    pub(crate) reports: Vec<ReportResult>,
    pub(crate) exported: Vec<PathBuf>,
}

impl RunSummary {
    /// Raw entries returned by the listing, Parquet or not.
    pub fn objects_listed(&self) -> usize {
        self.objects_listed
    }

    pub fn files(&self) -> &[ParquetFile] {
        &self.files
    }

    pub fn loaded_uris(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.uri()).collect()
    }

    /// Load statements issued against the engine, one per file.
    pub fn statements_executed(&self) -> usize {
        self.statements_executed
    }

    pub fn reports(&self) -> &[ReportResult] {
        &self.reports
    }

    pub fn report(&self, name: &str) -> Option<&ReportResult> {
        self.reports.iter().find(|r| r.name() == name)
    }

    pub fn exported(&self) -> &[PathBuf] {
        &self.exported
    }

    pub fn total_events(&self) -> Result<i64> {
        self.report("total_events")
            .context("Run has no total_events report")?
            .total()
    }
}
