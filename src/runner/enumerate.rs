use super::{Configured, Enumerated};
use crate::imports::*;

impl Runner<Configured> {
    #[tracing::instrument(skip(self), fields(bucket = %self.config.bucket(), prefix = %self.config.prefix()))]
    pub async fn enumerate(self) -> Result<Runner<Enumerated>> {
        let Runner {
            config,
            services,
            state: Configured { enumerator },
        } = self;

        let listing = enumerator
            .list_parquet_files(config.prefix(), config.listing_mode())
            .await?;

        // Nothing is loaded and no engine session is opened for an empty prefix.
        if listing.files.is_empty() {
            tracing::warn!(
                objects_seen = listing.objects_seen,
                "No parquet files found under prefix"
            );
            return Err(IngestError::NoParquetFiles {
                bucket: config.bucket().to_string(),
                prefix: config.prefix().to_string(),
            }
            .into());
        }

        tracing::info!(
            objects_seen = listing.objects_seen,
            parquet_files = listing.files.len(),
            "Enumerated parquet files"
        );
        Ok(Runner {
            config,
            services,
            state: Enumerated {
                enumerator,
                listing,
            },
        })
    }
}
