use std::path::Path;

use smartbin_core::{Measurement, MeasurementSource, RewardRecord, WeightUnit};

use crate::app::CliError;
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

pub(crate) fn cmd_reward(
    config_path: Option<&Path>,
    weight: &str,
    unit: WeightUnit,
    quality: Option<u8>,
    output: OutputFormat,
    _quiet: bool,
) -> Result<(), CliError> {
    let quality = match quality {
        Some(q) => q,
        None => SmartbinConfig::load(config_path)?.deposit.quality_percent,
    };
    if quality > 100 {
        return Err(CliError::Usage(format!(
            "--quality must be 0..=100, got {}",
            quality
        )));
    }

    let reward = RewardRecord::from_measurement(Measurement {
        weight_grams: unit.parse_grams(weight),
        quality_percent: quality,
        source: MeasurementSource::UserSupplied,
    });

    match output {
        OutputFormat::Json => print_json(&reward)?,
        OutputFormat::Text => {
            println!("{} coins, {} eco-points", reward.coins_awarded, reward.eco_points);
        }
    }
    Ok(())
}
