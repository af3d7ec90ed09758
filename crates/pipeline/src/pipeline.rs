//! One deposit, start to finish: capture, classify, store, reward.
//!
//! The classification request goes out first; weighing and geolocation
//! follow it. A placeholder weight earns coins but is never stored.
//! Stages run strictly in sequence and each deposit holds the pipeline's
//! busy guard, so at most one classification request is outstanding per
//! pipeline. Classification never fails outright; a storage failure is
//! reported in the [`DepositReport`] and does not withhold the reward.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use smartbin_classify::ClassificationClient;
use smartbin_core::{
    ClassificationResult, FallbackReason, Outcome, RewardRecord, SampleMeasurer, WasteSample,
};
use smartbin_storage::WasteUploadRecord;

use crate::capture::CaptureSource;
use crate::error::{PersistError, PipelineError};
use crate::location::{locate, Coordinates, LocationProvider, LocationRequest};
use crate::persist::{PersistenceAdapter, UploadMetadata};
use crate::sink::{Notification, ResultSink, SinkEvent};

/// What happened to one deposit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReport {
    pub classification: ClassificationResult,
    /// `model` when the endpoint answered, `fallback` otherwise.
    pub origin: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<WasteUploadRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
    /// Blob left behind when the row insert failed after the upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_key: Option<String>,
    pub reward: RewardRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

/// Clears the busy flag when the deposit ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DepositPipeline {
    classifier: Arc<ClassificationClient>,
    persistence: PersistenceAdapter,
    location: Option<Arc<dyn LocationProvider>>,
    location_request: LocationRequest,
    persist_fallbacks: bool,
    busy: AtomicBool,
}

impl DepositPipeline {
    pub fn new(classifier: Arc<ClassificationClient>, persistence: PersistenceAdapter) -> Self {
        Self {
            classifier,
            persistence,
            location: None,
            location_request: LocationRequest::default(),
            persist_fallbacks: false,
            busy: AtomicBool::new(false),
        }
    }

    /// Attach pickup coordinates from `provider` to every upload.
    pub fn with_location(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(provider);
        self
    }

    pub fn with_location_request(mut self, request: LocationRequest) -> Self {
        self.location_request = request;
        self
    }

    /// Also store samples whose classification is the offline fallback.
    pub fn with_persist_fallbacks(mut self, persist: bool) -> Self {
        self.persist_fallbacks = persist;
        self
    }

    pub fn classifier(&self) -> &Arc<ClassificationClient> {
        &self.classifier
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    /// True while a deposit is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, PipelineError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| PipelineError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    /// Capture from `source`, then process the sample.
    ///
    /// Device failures are reported to `sink` and returned; nothing is
    /// classified or stored in that case.
    pub async fn run(
        &self,
        source: &mut dyn CaptureSource,
        measurer: &dyn SampleMeasurer,
        sink: &dyn ResultSink,
    ) -> Result<DepositReport, PipelineError> {
        let _guard = self.acquire()?;

        let session = match source.start().await {
            Ok(session) => session,
            Err(e) => {
                sink.deliver(SinkEvent::Notice(Notification::error(format!(
                    "Could not access the camera: {}",
                    e
                ))));
                return Err(e.into());
            }
        };
        let sample = match session.capture().await {
            Ok(sample) => sample,
            Err(e) => {
                sink.deliver(SinkEvent::Notice(Notification::error(format!(
                    "Could not capture an image: {}",
                    e
                ))));
                return Err(e.into());
            }
        };
        self.process(sample, measurer, sink).await
    }

    /// Process an already-captured sample.
    pub async fn deposit_sample(
        &self,
        sample: WasteSample,
        measurer: &dyn SampleMeasurer,
        sink: &dyn ResultSink,
    ) -> Result<DepositReport, PipelineError> {
        let _guard = self.acquire()?;
        self.process(sample, measurer, sink).await
    }

    async fn process(
        &self,
        sample: WasteSample,
        measurer: &dyn SampleMeasurer,
        sink: &dyn ResultSink,
    ) -> Result<DepositReport, PipelineError> {
        let outcome = self.classifier.classify_image_tagged(&sample.image).await;
        let origin = outcome.origin();
        let fallback_reason = outcome.reason().cloned();
        let classification = match outcome {
            Outcome::Ok(c) | Outcome::Fallback { value: c, .. } => c.result,
            Outcome::Failed(_) => smartbin_core::fallback_classification(),
        };
        if fallback_reason.is_some() {
            sink.deliver(SinkEvent::Notice(Notification::warning(
                "Classification service unavailable; showing an offline estimate",
            )));
        }
        sink.deliver(SinkEvent::Classified {
            result: classification.clone(),
            origin,
        });

        let measurement = match measurer.measure(&sample).await {
            Ok(m) => m,
            Err(e) => {
                sink.deliver(SinkEvent::Notice(Notification::error(format!(
                    "Could not weigh the deposit: {}",
                    e
                ))));
                return Err(e.into());
            }
        };

        let location = match &self.location {
            Some(provider) => match locate(provider.as_ref(), self.location_request).await {
                Ok(coords) => Some(coords),
                Err(e) => {
                    sink.deliver(SinkEvent::Notice(Notification::warning(format!(
                        "Pickup location unavailable: {}",
                        e
                    ))));
                    None
                }
            },
            None => None,
        };

        let mut report = DepositReport {
            classification,
            origin,
            fallback_reason,
            persisted: false,
            upload: None,
            persist_error: None,
            orphaned_key: None,
            reward: RewardRecord::from_measurement(measurement),
            location,
        };

        if report.fallback_reason.is_none() || self.persist_fallbacks {
            let metadata = UploadMetadata {
                weight_grams: measurement.recorded_weight_grams(),
                location,
            };
            match self
                .persistence
                .upload(sample, &report.classification, &metadata)
                .await
            {
                Ok(record) => {
                    sink.deliver(SinkEvent::Persisted {
                        record: record.clone(),
                    });
                    report.persisted = true;
                    report.upload = Some(record);
                }
                Err(e) => {
                    sink.deliver(SinkEvent::Notice(Notification::error(format!(
                        "Your deposit could not be saved: {}",
                        e
                    ))));
                    if let PersistError::RecordInsert { orphaned_key, .. } = &e {
                        report.orphaned_key = Some(orphaned_key.clone());
                    }
                    report.persist_error = Some(e.to_string());
                }
            }
        } else {
            tracing::info!("offline classification not stored");
        }

        sink.deliver(SinkEvent::Rewarded {
            reward: report.reward.clone(),
        });
        if report.reward.coins_awarded > 0 {
            sink.deliver(SinkEvent::Notice(Notification::info(format!(
                "You earned {} coins!",
                report.reward.coins_awarded
            ))));
        }
        tracing::info!(
            origin,
            persisted = report.persisted,
            coins = report.reward.coins_awarded,
            "deposit processed"
        );
        Ok(report)
    }
}
