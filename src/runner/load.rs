use super::{Enumerated, Loaded};
use crate::imports::*;

impl Runner<Enumerated> {
    /// Creates the events table from the first file and appends every remaining file to it.
    #[tracing::instrument(skip(self), fields(files = self.state.listing.files.len()))]
    pub async fn load(self) -> Result<Runner<Loaded>> {
        let Runner {
            config,
            services,
            state: Enumerated {
                enumerator,
                listing,
            },
        } = self;

        let (first, rest) = listing.files.split_first().ok_or_else(|| {
            IngestError::NoParquetFiles {
                bucket: config.bucket().to_string(),
                prefix: config.prefix().to_string(),
            }
        })?;

        let remote = enumerator.is_remote().then(|| config.storage().clone());
        let session = EngineSession::open(remote).await?;

        load_file(
            &session,
            first,
            sql::create_table_from_parquet(EVENTS_TABLE, first.uri()),
        )
        .await?;
        for file in rest {
            load_file(
                &session,
                file,
                sql::insert_from_parquet(EVENTS_TABLE, file.uri()),
            )
            .await?;
        }

        tracing::info!(
            table = EVENTS_TABLE,
            statements = session.statements_executed(),
            "Loaded parquet files"
        );
        Ok(Runner {
            config,
            services,
            state: Loaded {
                session,
                objects_listed: listing.objects_seen,
                files: listing.files,
            },
        })
    }
}

async fn load_file(session: &EngineSession, file: &ParquetFile, statement: String) -> Result<()> {
    session.execute(statement).await?.map_err(|source| {
        tracing::warn!(uri = file.uri(), error = %source, "Failed to load parquet file");
        IngestError::Load {
            uri: file.uri().to_string(),
            table: EVENTS_TABLE.to_string(),
            source,
        }
    })?;
    tracing::debug!(uri = file.uri(), "Loaded parquet file");
    Ok(())
}
