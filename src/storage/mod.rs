/*
    Object storage enumeration:
    * ObjectEnumerator wraps an `Arc<dyn ObjectStore>` together with the URI prefix the engine
      needs to read the same objects back (`s3://<bucket>/` or a local root directory).
    * Listing is restricted to keys ending in `.parquet`, in the order the store returns them.
    * ListingMode decides whether only the first listing page is consulted (the observed
      single-call behavior) or the listing is followed to the end.
*/
use crate::imports::*;
use futures::StreamExt;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;

pub const PARQUET_EXTENSION: &str = ".parquet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    FirstPage { page_size: usize },
    AllPages,
}

impl Default for ListingMode {
    fn default() -> Self {
        ListingMode::FirstPage {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParquetFile {
    key: String,
    uri: String,
}

impl ParquetFile {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/*
    Listing - Outcome of one enumeration: every Parquet key found plus how many raw entries were seen.
    `possibly_truncated` is set when the first page filled up in FirstPage mode.
*/
#[derive(Debug, Clone)]
pub struct Listing {
    pub objects_seen: usize,
    pub possibly_truncated: bool,
    pub files: Vec<ParquetFile>,
}

#[derive(Clone)]
pub struct ObjectEnumerator {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    base_uri: String,
}

impl std::fmt::Debug for ObjectEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEnumerator")
            .field("store", &self.store.to_string())
            .field("bucket", &self.bucket)
            .field("base_uri", &self.base_uri)
            .finish()
    }
}

impl ObjectEnumerator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        base_uri: impl Into<String>,
    ) -> Self {
        ObjectEnumerator {
            store,
            bucket: bucket.into(),
            base_uri: base_uri.into(),
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        match &config.storage().local_root {
            Some(root) => Self::local(root, config.bucket()),
            None => Self::s3(config.bucket(), config.storage()),
        }
    }

    // Credentials come from the settings when given, otherwise from the usual AWS_* variables.
    pub fn s3(bucket: &str, settings: &StorageSettings) -> Result<Self> {
        tracing::debug!(bucket = bucket, settings = ?settings, "Creating S3 object store");
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_allow_http(settings.allow_http);

        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }
        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
            if let Some(token) = &settings.session_token {
                builder = builder.with_token(token);
            }
        }

        let store = builder.build().map_err(|source| IngestError::StorageSetup {
            bucket: bucket.to_string(),
            location: format!("s3://{}", bucket),
            source,
        })?;

        Ok(Self::new(Arc::new(store), bucket, format!("s3://{}/", bucket)))
    }

    pub fn local(root: &Path, bucket: &str) -> Result<Self> {
        tracing::debug!(root = %root.display(), "Creating local filesystem object store");
        let store = LocalFileSystem::new_with_prefix(root).map_err(|source| {
            IngestError::StorageSetup {
                bucket: bucket.to_string(),
                location: root.display().to_string(),
                source,
            }
        })?;
        let base = root.display().to_string();
        let base_uri = format!("{}/", base.trim_end_matches('/'));
        Ok(Self::new(Arc::new(store), bucket, base_uri))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn is_remote(&self) -> bool {
        self.base_uri.starts_with("s3://")
    }

    pub fn uri_for(&self, key: &str) -> String {
        format!("{}{}", self.base_uri, key)
    }

    /// Lists the Parquet keys starting with `prefix`.
    ///
    /// `prefix` is a plain string prefix as in S3 ListObjectsV2, so it may end partway through a
    /// path segment. The store is listed from the last complete segment and keys are filtered
    /// here. Only keys matching the prefix count towards the first page.
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn list_parquet_files(&self, prefix: &str, mode: ListingMode) -> Result<Listing> {
        let parent = listing_parent(prefix);
        let mut stream = self.store.list(parent.as_ref());

        let limit = match mode {
            ListingMode::FirstPage { page_size } => Some(page_size),
            ListingMode::AllPages => None,
        };

        let mut objects_seen = 0usize;
        let mut files = Vec::new();
        while let Some(entry) = stream.next().await {
            let meta = entry.map_err(|source| IngestError::StorageAccess {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                source,
            })?;
            let key = meta.location.to_string();
            if !key.starts_with(prefix) {
                continue;
            }
            objects_seen += 1;

            if key.ends_with(PARQUET_EXTENSION) {
                tracing::debug!(key = %key, size = meta.size, "Found parquet object");
                files.push(ParquetFile {
                    uri: self.uri_for(&key),
                    key,
                });
            } else {
                tracing::debug!(key = %key, "Skipping non-parquet object");
            }

            if limit.is_some_and(|page_size| objects_seen >= page_size) {
                break;
            }
        }

        let possibly_truncated = limit.is_some_and(|page_size| objects_seen >= page_size);
        if possibly_truncated {
            tracing::warn!(
                prefix = prefix,
                objects_seen = objects_seen,
                "Listing stopped after the first page; objects beyond it are not loaded"
            );
        }

        tracing::info!(
            prefix = prefix,
            objects_seen = objects_seen,
            parquet_files = files.len(),
            "Listed objects"
        );

        Ok(Listing {
            objects_seen,
            possibly_truncated,
            files,
        })
    }
}

// Deepest complete path segment of a string prefix, `None` when the prefix has no `/`.
fn listing_parent(prefix: &str) -> Option<ObjectPath> {
    prefix
        .rfind('/')
        .map(|end| &prefix[..end])
        .filter(|parent| !parent.is_empty())
        .map(ObjectPath::from)
}
