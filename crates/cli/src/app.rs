//! Wires configuration into clients, stores and the deposit pipeline.

use std::sync::Arc;

use smartbin_classify::{ClassificationClient, GeminiClient, GeminiConfig};
use smartbin_pipeline::{
    Assistant, Coordinates, DepositPipeline, FixedLocation, PersistenceAdapter, PipelineError,
    SessionError, SessionStore,
};
use smartbin_storage::{BlobStore, MemoryBackend, RecordStore, RestBackend, RestConfig, StorageError};

use crate::config::{ConfigError, SmartbinConfig, StorageBackend};

/// Everything a command can fail with.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}

/// Long-lived services built once per process.
pub(crate) struct Services {
    pub(crate) config: SmartbinConfig,
    pub(crate) classifier: Arc<ClassificationClient>,
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) persistence: PersistenceAdapter,
}

impl Services {
    /// Build from `config`. Fails if no inference key is configured.
    pub(crate) fn from_config(config: SmartbinConfig) -> Result<Self, CliError> {
        let classifier = Arc::new(build_classifier(&config)?);
        let (blobs, records) = build_storage(&config);
        let persistence =
            PersistenceAdapter::new(blobs, records.clone()).with_bucket(config.storage.bucket.clone());
        Ok(Self {
            config,
            classifier,
            records,
            persistence,
        })
    }

    /// A deposit pipeline, optionally tagging uploads with fixed coordinates.
    pub(crate) fn pipeline(&self, location: Option<Coordinates>) -> DepositPipeline {
        let pipeline = DepositPipeline::new(self.classifier.clone(), self.persistence.clone())
            .with_persist_fallbacks(self.config.deposit.persist_fallbacks);
        match location {
            Some(coords) => pipeline.with_location(Arc::new(FixedLocation(coords))),
            None => pipeline,
        }
    }

    pub(crate) fn assistant(&self) -> Assistant {
        Assistant::new(self.classifier.clone(), self.records.clone())
    }

    pub(crate) fn session_store(&self) -> Result<SessionStore, CliError> {
        open_session(&self.config)
    }
}

pub(crate) fn open_session(config: &SmartbinConfig) -> Result<SessionStore, CliError> {
    Ok(SessionStore::open(config.session.path.clone())?)
}

fn build_classifier(config: &SmartbinConfig) -> Result<ClassificationClient, CliError> {
    let gemini = GeminiConfig::new(config.inference_api_key()?)
        .with_base_url(config.inference.base_url.clone())
        .with_model(config.inference.model.clone())
        .with_timeout(config.inference_timeout());
    tracing::debug!(endpoint = %gemini.endpoint(), "inference client configured");
    Ok(ClassificationClient::new(Box::new(GeminiClient::new(gemini))))
}

pub(crate) fn build_storage(config: &SmartbinConfig) -> (Arc<dyn BlobStore>, Arc<dyn RecordStore>) {
    match (
        config.storage.backend,
        config.storage.url.as_deref(),
        config.storage.api_key.as_deref(),
    ) {
        (StorageBackend::Rest, Some(url), Some(key)) => {
            let backend = Arc::new(RestBackend::new(
                RestConfig::new(url, key).with_timeout(config.storage_timeout()),
            ));
            tracing::debug!(url, "using REST storage backend");
            let blobs: Arc<dyn BlobStore> = backend.clone();
            let records: Arc<dyn RecordStore> = backend;
            (blobs, records)
        }
        _ => {
            tracing::debug!("using in-memory storage backend");
            let backend = Arc::new(MemoryBackend::new());
            let blobs: Arc<dyn BlobStore> = backend.clone();
            let records: Arc<dyn RecordStore> = backend;
            (blobs, records)
        }
    }
}
