//! Pickup location lookup.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// How long to wait for a position fix.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Options passed to the provider for one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: LOCATION_TIMEOUT,
        }
    }
}

/// Source of the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(
        &self,
        request: &LocationRequest,
    ) -> Result<Coordinates, CaptureError>;
}

/// Ask `provider` for a fix, giving up after `request.timeout`.
///
/// Timeouts and denials come back as [`CaptureError::DeviceAccess`].
pub async fn locate(
    provider: &dyn LocationProvider,
    request: LocationRequest,
) -> Result<Coordinates, CaptureError> {
    match tokio::time::timeout(request.timeout, provider.current_position(&request)).await {
        Ok(Ok(coords)) => Ok(coords),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "location lookup failed");
            Err(e)
        }
        Err(_) => {
            tracing::warn!(timeout_ms = request.timeout.as_millis() as u64, "location lookup timed out");
            Err(CaptureError::DeviceAccess(format!(
                "no position fix within {} ms",
                request.timeout.as_millis()
            )))
        }
    }
}

/// A fixed position, e.g. one typed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _request: &LocationRequest,
    ) -> Result<Coordinates, CaptureError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverAnswers;

    #[async_trait]
    impl LocationProvider for NeverAnswers {
        async fn current_position(
            &self,
            _request: &LocationRequest,
        ) -> Result<Coordinates, CaptureError> {
            std::future::pending().await
        }
    }

    struct Denied;

    #[async_trait]
    impl LocationProvider for Denied {
        async fn current_position(
            &self,
            request: &LocationRequest,
        ) -> Result<Coordinates, CaptureError> {
            assert!(request.high_accuracy);
            Err(CaptureError::DeviceAccess("permission denied".to_string()))
        }
    }

    #[test]
    fn default_request_is_high_accuracy_with_ten_second_timeout() {
        let request = LocationRequest::default();
        assert!(request.high_accuracy);
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn silent_provider_times_out() {
        let request = LocationRequest {
            timeout: Duration::from_millis(20),
            ..LocationRequest::default()
        };
        let err = locate(&NeverAnswers, request).await.unwrap_err();
        match err {
            CaptureError::DeviceAccess(msg) => assert!(msg.contains("20 ms")),
            other => panic!("expected DeviceAccess, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn denial_is_device_access_error() {
        let err = locate(&Denied, LocationRequest::default()).await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceAccess(_)));
    }

    #[tokio::test]
    async fn fixed_location_answers_immediately() {
        let here = Coordinates {
            latitude: 12.97,
            longitude: 77.59,
        };
        let got = locate(&FixedLocation(here), LocationRequest::default())
            .await
            .unwrap();
        assert_eq!(got, here);
    }
}
