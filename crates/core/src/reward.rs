//! Coin rewards for deposited waste.
//!
//! `coins = floor(weight_kg * quality_percent * 0.8)`. The function is pure;
//! where the weight and quality come from is a [`SampleMeasurer`] strategy so
//! the randomized placeholder can be swapped for a weighing scale without
//! touching callers.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::types::WasteSample;

/// Placeholder weight range in grams, used when no sensor is present.
pub const PLACEHOLDER_WEIGHT_GRAMS: (u32, u32) = (100, 2000);

/// Placeholder quality range in percent.
pub const PLACEHOLDER_QUALITY_PERCENT: (u8, u8) = (60, 100);

/// Eco-points earned per coin, as a ratio: 1.2 = 12 / 10.
const ECO_POINTS_PER_COIN: (u64, u64) = (12, 10);

/// Coins for a deposit of `weight_grams` at `quality_percent`.
///
/// Quality above 100 is clamped. Absent, negative or non-finite weight
/// earns nothing. Computed as `grams * quality * 8 / 10_000`, which is the
/// 0.8 coins-per-kilogram-percent rate without the binary rounding error of
/// multiplying by 0.8 directly.
pub fn compute_coins(weight_grams: Option<f64>, quality_percent: u8) -> u64 {
    let grams = match weight_grams {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => return 0,
    };
    let quality = f64::from(quality_percent.min(100));
    let coins = (grams * quality * 8.0 / 10_000.0).floor();
    if coins.is_finite() && coins > 0.0 {
        coins as u64
    } else {
        0
    }
}

/// Eco-points credited alongside `coins`.
pub fn eco_points_for(coins: u64) -> u64 {
    let (num, den) = ECO_POINTS_PER_COIN;
    coins.saturating_mul(num) / den
}

/// Unit the user typed the weight in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Grams,
    Kilograms,
}

impl WeightUnit {
    /// Convert a typed value to grams. Non-positive or non-finite input means no weight.
    pub fn to_grams(self, value: f64) -> Option<f64> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(match self {
            WeightUnit::Grams => value,
            WeightUnit::Kilograms => value * 1000.0,
        })
    }

    /// Parse free-form input such as `"1.5"`. Blank or unparsable input is no weight.
    pub fn parse_grams(self, input: &str) -> Option<f64> {
        input
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|v| self.to_grams(v))
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(WeightUnit::Grams),
            "kg" | "kilogram" | "kilograms" => Ok(WeightUnit::Kilograms),
            other => Err(format!("unknown weight unit '{}'", other)),
        }
    }
}

/// Where a measurement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementSource {
    UserSupplied,
    Randomized,
    Scale,
}

/// Weight and quality of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub weight_grams: Option<f64>,
    pub quality_percent: u8,
    pub source: MeasurementSource,
}

impl Measurement {
    /// Weight fit for storage. Placeholder readings are not measurements.
    pub fn recorded_weight_grams(&self) -> Option<f64> {
        recorded_weight(self.weight_grams, self.source)
    }
}

fn recorded_weight(weight_grams: Option<f64>, source: MeasurementSource) -> Option<f64> {
    match source {
        MeasurementSource::Randomized => None,
        MeasurementSource::UserSupplied | MeasurementSource::Scale => weight_grams,
    }
}

/// Coins credited for one classified sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardRecord {
    pub weight_grams: Option<f64>,
    pub quality_percent: u8,
    pub coins_awarded: u64,
    pub eco_points: u64,
    pub measurement: MeasurementSource,
}

impl RewardRecord {
    pub fn from_measurement(m: Measurement) -> Self {
        let coins = compute_coins(m.weight_grams, m.quality_percent);
        Self {
            weight_grams: m.weight_grams,
            quality_percent: m.quality_percent.min(100),
            coins_awarded: coins,
            eco_points: eco_points_for(coins),
            measurement: m.source,
        }
    }

    /// Weight that counts towards recycling totals; `None` for placeholders.
    pub fn recorded_weight_grams(&self) -> Option<f64> {
        recorded_weight(self.weight_grams, self.measurement)
    }
}

/// Errors from a measurement strategy.
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("weighing scale unavailable: {0}")]
    ScaleUnavailable(String),
    #[error("weighing scale returned an invalid reading: {0}")]
    InvalidReading(f64),
}

/// Strategy producing the weight and quality for a sample.
#[async_trait]
pub trait SampleMeasurer: Send + Sync {
    async fn measure(&self, sample: &WasteSample) -> Result<Measurement, MeasureError>;
}

/// Uses the weight the user typed in, with a fixed quality.
#[derive(Debug, Clone)]
pub struct UserSuppliedMeasurer {
    pub weight_grams: Option<f64>,
    pub quality_percent: u8,
}

#[async_trait]
impl SampleMeasurer for UserSuppliedMeasurer {
    async fn measure(&self, _sample: &WasteSample) -> Result<Measurement, MeasureError> {
        Ok(Measurement {
            weight_grams: self.weight_grams,
            quality_percent: self.quality_percent.min(100),
            source: MeasurementSource::UserSupplied,
        })
    }
}

/// Stand-in for a missing sensor: uniform weight and quality within the
/// placeholder ranges.
pub struct RandomizedMeasurer {
    rng: Mutex<StdRng>,
}

impl RandomizedMeasurer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomizedMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleMeasurer for RandomizedMeasurer {
    async fn measure(&self, _sample: &WasteSample) -> Result<Measurement, MeasureError> {
        let (weight, quality) = {
            let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
            let (wmin, wmax) = PLACEHOLDER_WEIGHT_GRAMS;
            let (qmin, qmax) = PLACEHOLDER_QUALITY_PERCENT;
            (rng.gen_range(wmin..=wmax), rng.gen_range(qmin..=qmax))
        };
        Ok(Measurement {
            weight_grams: Some(f64::from(weight)),
            quality_percent: quality,
            source: MeasurementSource::Randomized,
        })
    }
}

/// A physical weighing scale.
#[async_trait]
pub trait WeighingScale: Send + Sync {
    async fn read_grams(&self) -> Result<f64, MeasureError>;
}

/// Reads weight from a [`WeighingScale`]; quality is fixed until a
/// quality sensor exists.
pub struct ScaleMeasurer<S> {
    scale: S,
    quality_percent: u8,
}

impl<S: WeighingScale> ScaleMeasurer<S> {
    pub fn new(scale: S, quality_percent: u8) -> Self {
        Self {
            scale,
            quality_percent,
        }
    }
}

#[async_trait]
impl<S: WeighingScale> SampleMeasurer for ScaleMeasurer<S> {
    async fn measure(&self, _sample: &WasteSample) -> Result<Measurement, MeasureError> {
        let grams = self.scale.read_grams().await?;
        if !grams.is_finite() || grams < 0.0 {
            return Err(MeasureError::InvalidReading(grams));
        }
        Ok(Measurement {
            weight_grams: Some(grams),
            quality_percent: self.quality_percent.min(100),
            source: MeasurementSource::Scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EncodedImage;

    fn sample() -> WasteSample {
        WasteSample::new(EncodedImage::jpeg(vec![0xFF, 0xD8]))
    }

    #[test]
    fn half_kilo_at_ninety_percent_is_36() {
        assert_eq!(compute_coins(Some(500.0), 90), 36);
    }

    #[test]
    fn absent_or_invalid_weight_earns_nothing() {
        assert_eq!(compute_coins(None, 100), 0);
        assert_eq!(compute_coins(Some(-5.0), 100), 0);
        assert_eq!(compute_coins(Some(f64::NAN), 100), 0);
        assert_eq!(compute_coins(Some(f64::INFINITY), 100), 0);
        assert_eq!(compute_coins(Some(0.0), 100), 0);
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(compute_coins(Some(1000.0), 250), compute_coins(Some(1000.0), 100));
        assert_eq!(compute_coins(Some(1000.0), 100), 80);
    }

    #[test]
    fn monotonic_in_weight_and_quality() {
        for q in (0..=100u8).step_by(5) {
            let mut prev = 0;
            for grams in (0..=5000).step_by(37) {
                let c = compute_coins(Some(f64::from(grams)), q);
                assert!(c >= prev, "weight {} quality {}: {} < {}", grams, q, c, prev);
                prev = c;
            }
        }
        for grams in (0..=5000).step_by(125) {
            let mut prev = 0;
            for q in 0..=100u8 {
                let c = compute_coins(Some(f64::from(grams)), q);
                assert!(c >= prev, "weight {} quality {}: {} < {}", grams, q, c, prev);
                prev = c;
            }
        }
    }

    #[test]
    fn eco_points_scale_coins() {
        assert_eq!(eco_points_for(36), 43);
        assert_eq!(eco_points_for(0), 0);
        assert_eq!(eco_points_for(10), 12);
    }

    #[test]
    fn weight_unit_conversion() {
        assert_eq!(WeightUnit::Kilograms.to_grams(1.5), Some(1500.0));
        assert_eq!(WeightUnit::Grams.to_grams(250.0), Some(250.0));
        assert_eq!(WeightUnit::Grams.to_grams(0.0), None);
        assert_eq!(WeightUnit::Grams.parse_grams(""), None);
        assert_eq!(WeightUnit::Grams.parse_grams("abc"), None);
        assert_eq!(WeightUnit::Kilograms.parse_grams(" 0.5 "), Some(500.0));
        assert_eq!("kg".parse::<WeightUnit>().unwrap(), WeightUnit::Kilograms);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn reward_record_from_measurement() {
        let r = RewardRecord::from_measurement(Measurement {
            weight_grams: Some(500.0),
            quality_percent: 90,
            source: MeasurementSource::UserSupplied,
        });
        assert_eq!(r.coins_awarded, 36);
        assert_eq!(r.eco_points, 43);
        assert_eq!(r.measurement, MeasurementSource::UserSupplied);
    }

    #[tokio::test]
    async fn randomized_measurer_stays_in_range_and_is_seedable() {
        let a = RandomizedMeasurer::seeded(42);
        let b = RandomizedMeasurer::seeded(42);
        for _ in 0..50 {
            let ma = a.measure(&sample()).await.unwrap();
            let mb = b.measure(&sample()).await.unwrap();
            assert_eq!(ma, mb);
            let w = ma.weight_grams.unwrap();
            assert!((100.0..=2000.0).contains(&w));
            assert!((60..=100).contains(&ma.quality_percent));
            assert_eq!(ma.source, MeasurementSource::Randomized);
        }
    }

    struct FixedScale(f64);

    #[async_trait]
    impl WeighingScale for FixedScale {
        async fn read_grams(&self) -> Result<f64, MeasureError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn scale_measurer_reads_weight() {
        let m = ScaleMeasurer::new(FixedScale(750.0), 90)
            .measure(&sample())
            .await
            .unwrap();
        assert_eq!(m.weight_grams, Some(750.0));
        assert_eq!(m.source, MeasurementSource::Scale);
    }

    #[tokio::test]
    async fn scale_measurer_rejects_negative_reading() {
        let err = ScaleMeasurer::new(FixedScale(-1.0), 90)
            .measure(&sample())
            .await
            .unwrap_err();
        assert!(matches!(err, MeasureError::InvalidReading(_)));
    }

    #[tokio::test]
    async fn user_supplied_measurer_passes_weight_through() {
        let m = UserSuppliedMeasurer {
            weight_grams: None,
            quality_percent: 80,
        }
        .measure(&sample())
        .await
        .unwrap();
        assert_eq!(m.weight_grams, None);
        assert_eq!(RewardRecord::from_measurement(m).coins_awarded, 0);
    }
}
