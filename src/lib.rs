mod config;
mod engine;
mod error;
mod reports;
mod runner;
mod services;
mod storage;
mod values;

#[cfg(test)]
mod test_utils;

// Library exports
pub mod prelude {
    // Configuration
    pub use crate::config::{OutputFormat, RunnerConfig, StorageSettings};

    // Errors
    pub use crate::error::{IngestError, ingest_error};

    // Runner
    pub use crate::runner::{Completed, Configured, Enumerated, Loaded, RunSummary, Runner};

    // Storage
    pub use crate::storage::{Listing, ListingMode, ObjectEnumerator, ParquetFile};

    // Engine
    pub use crate::engine::{EVENTS_TABLE, EngineSession};

    // Reports
    pub use crate::reports::export::{ExportSettings, TabularFormat};
    pub use crate::reports::{ReportQuery, ReportResult};

    // Output services
    pub use crate::services::io::{BufferedInteraction, StdoutInteraction};
    pub use crate::services::{ReportIO, RunnerServices};

    // Values
    pub use crate::values::tabular::TabularValue;
}

// Internal imports for use within the crate
#[allow(unused_imports)]
pub(crate) mod imports {
    pub use crate::config::*;
    pub use crate::engine::{EVENTS_TABLE, EngineSession, sql};
    pub use crate::error::IngestError;
    pub use crate::reports::{ReportQuery, ReportResult, export::*};
    pub use crate::runner::*;
    pub use crate::services::{ReportIO, RunnerServices, io::*};
    pub use crate::storage::*;
    pub use crate::values::tabular::*;

    // Result and error handling
    pub type Result<T> = anyhow::Result<T>;
    pub use anyhow::Context as _;

    // File I/O
    pub use std::path::{Path, PathBuf};

    // Collections
    pub use std::collections::HashMap;

    // Async
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use tokio::sync::RwLock;

    // Lazy initialization
    pub use std::sync::LazyLock;
}
