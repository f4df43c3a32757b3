/*
    Types:
    * IngestError - Failure taxonomy of a run. Travels inside anyhow::Error, callers that need to
      tell failures apart recover it with `downcast_ref::<IngestError>()`.
*/
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to set up object store for bucket '{bucket}' at '{location}'")]
    StorageSetup {
        bucket: String,
        location: String,
        #[source]
        source: object_store::Error,
    },

    #[error("failed to list objects in bucket '{bucket}' under prefix '{prefix}'")]
    StorageAccess {
        bucket: String,
        prefix: String,
        #[source]
        source: object_store::Error,
    },

    #[error("no parquet files found in bucket '{bucket}' under prefix '{prefix}'")]
    NoParquetFiles { bucket: String, prefix: String },

    #[error("engine setup failed: {context}")]
    Engine {
        context: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("failed to load '{uri}' into table '{table}'")]
    Load {
        uri: String,
        table: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("report '{report}' failed")]
    Query {
        report: String,
        #[source]
        source: duckdb::Error,
    },
}

impl IngestError {
    pub fn is_no_parquet_files(&self) -> bool {
        matches!(self, IngestError::NoParquetFiles { .. })
    }
}

// Helper for `anyhow::Error` values coming back from a run.
pub fn ingest_error(err: &anyhow::Error) -> Option<&IngestError> {
    err.downcast_ref::<IngestError>()
}
