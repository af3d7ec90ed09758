use std::path::{Path, PathBuf};

use smartbin_core::{MeasurementSource, RandomizedMeasurer, SampleMeasurer, UserSuppliedMeasurer};
use smartbin_pipeline::{
    CollectingSink, Coordinates, DepositReport, FileCapture, Session, SessionError, Severity,
};

use crate::app::{CliError, Services};
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

/// The `--weight` flag as typed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WeightArg {
    /// Flag absent: a placeholder reading is used.
    Absent,
    /// Flag given, in grams; `None` when the value was not positive.
    Given(Option<f64>),
}

pub(crate) struct DepositArgs {
    pub(crate) image: PathBuf,
    pub(crate) weight: WeightArg,
    pub(crate) quality: Option<u8>,
    /// `(latitude, longitude)`
    pub(crate) location: Option<(f64, f64)>,
}

#[derive(serde::Serialize)]
struct DepositOutput<'a> {
    #[serde(flatten)]
    report: &'a DepositReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a Session>,
}

pub(crate) async fn cmd_deposit(
    config_path: Option<&Path>,
    args: DepositArgs,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let config = SmartbinConfig::load(config_path)?;
    let quality = args.quality.unwrap_or(config.deposit.quality_percent);
    if quality > 100 {
        return Err(CliError::Usage(format!(
            "--quality must be 0..=100, got {}",
            quality
        )));
    }
    let services = Services::from_config(config)?;
    // Open the session first so a corrupt file fails before anything is stored.
    let mut sessions = services.session_store()?;

    let location = args.location.map(|(latitude, longitude)| Coordinates {
        latitude,
        longitude,
    });
    let pipeline = services.pipeline(location);

    let measurer: Box<dyn SampleMeasurer> = match args.weight {
        WeightArg::Given(weight_grams) => Box::new(UserSuppliedMeasurer {
            weight_grams,
            quality_percent: quality,
        }),
        WeightArg::Absent => Box::new(RandomizedMeasurer::new()),
    };

    let sink = CollectingSink::new();
    let mut source = FileCapture::new(&args.image);
    let report = pipeline
        .run(&mut source, measurer.as_ref(), &sink)
        .await?;

    let session = match sessions.credit_deposit(&report.reward) {
        Ok(session) => Some(session.clone()),
        Err(SessionError::NotLoggedIn) => None,
        Err(e) => return Err(e.into()),
    };

    match output {
        OutputFormat::Json => print_json(&DepositOutput {
            report: &report,
            session: session.as_ref(),
        })?,
        OutputFormat::Text => {
            if !quiet {
                for notice in sink.notifications() {
                    let label = match notice.severity {
                        Severity::Info => continue,
                        Severity::Warning => "warning",
                        Severity::Error => "error",
                    };
                    eprintln!("{}: {}", label, notice.message);
                }
            }
            print_report(&report);
            match &session {
                Some(s) => println!("Balance: {} coins, {} eco-points", s.coins, s.eco_points),
                None if !quiet => println!("Not logged in; reward not credited"),
                None => {}
            }
        }
    }
    Ok(())
}

pub(crate) fn print_report(report: &DepositReport) {
    let c = &report.classification;
    let tag = if report.fallback_reason.is_some() {
        " [offline estimate]"
    } else {
        ""
    };
    println!("Waste type: {}{}", c.waste_type, tag);
    println!("Classification: {}", c.classification);
    println!("Recommendations: {}", c.recommendations);
    println!("Recycling tips: {}", c.recycling_tips);
    match (&report.upload, &report.persist_error) {
        (Some(upload), _) => println!("Stored: {} ({})", upload.image_url, upload.id),
        (None, Some(err)) => println!("Not stored: {}", err),
        (None, None) => println!("Not stored: offline estimates are kept local"),
    }
    let r = &report.reward;
    let placeholder = if r.measurement == MeasurementSource::Randomized {
        ", placeholder reading"
    } else {
        ""
    };
    match r.weight_grams {
        Some(grams) => println!(
            "Reward: {} coins, {} eco-points ({} g at {}%{})",
            r.coins_awarded, r.eco_points, grams, r.quality_percent, placeholder
        ),
        None => println!("Reward: 0 coins (no weight)"),
    }
}
