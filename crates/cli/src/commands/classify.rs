use std::path::Path;

use smartbin_core::{FallbackReason, Outcome};
use smartbin_pipeline::{CaptureSource, FileCapture, PipelineError};

use crate::app::{CliError, Services};
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

pub(crate) async fn cmd_classify(
    config_path: Option<&Path>,
    image: &Path,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let services = Services::from_config(SmartbinConfig::load(config_path)?)?;

    let mut source = FileCapture::new(image);
    let sample = source
        .start()
        .await
        .map_err(PipelineError::from)?
        .capture()
        .await
        .map_err(PipelineError::from)?;

    let outcome = services
        .classifier
        .classify_image_tagged(&sample.image)
        .await;
    let origin = outcome.origin();
    let reason: Option<FallbackReason> = outcome.reason().cloned();
    let result = match outcome {
        Outcome::Ok(c) | Outcome::Fallback { value: c, .. } => c.result,
        Outcome::Failed(_) => smartbin_core::fallback_classification(),
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "classification": result,
            "origin": origin,
            "fallback_reason": reason,
        }))?,
        OutputFormat::Text => {
            if let (Some(reason), false) = (&reason, quiet) {
                eprintln!("warning: classification service unavailable ({})", reason);
            }
            println!("Waste type: {}", result.waste_type);
            println!("Classification: {}", result.classification);
            println!("Recommendations: {}", result.recommendations);
            println!("Recycling tips: {}", result.recycling_tips);
        }
    }
    Ok(())
}
