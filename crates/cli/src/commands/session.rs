use std::path::Path;

use smartbin_pipeline::Session;

use crate::app::{open_session, CliError};
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

pub(crate) enum SessionAction {
    Login(String),
    Show,
    Spend(u64),
    Logout,
}

pub(crate) fn cmd_session(
    config_path: Option<&Path>,
    action: SessionAction,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let config = SmartbinConfig::load(config_path)?;
    let mut store = open_session(&config)?;

    let session = match action {
        SessionAction::Login(identity) => Some(store.login(&identity)?.clone()),
        SessionAction::Show => Some(
            store
                .current()
                .cloned()
                .ok_or(smartbin_pipeline::SessionError::NotLoggedIn)?,
        ),
        SessionAction::Spend(coins) => Some(store.spend(coins)?.clone()),
        SessionAction::Logout => {
            store.logout()?;
            None
        }
    };

    match (output, session) {
        (OutputFormat::Json, Some(s)) => print_json(&s)?,
        (OutputFormat::Json, None) => print_json(&serde_json::json!({ "logged_out": true }))?,
        (OutputFormat::Text, Some(s)) => print_session(&s),
        (OutputFormat::Text, None) => {
            if !quiet {
                println!("Logged out");
            }
        }
    }
    Ok(())
}

fn print_session(s: &Session) {
    println!("User: {}", s.username);
    if let Some(email) = &s.email {
        println!("Email: {}", email);
    }
    println!("Coins: {}", s.coins);
    println!("Eco-points: {}", s.eco_points);
    println!("Recycled: {:.2} kg", s.recycled_weight_kg);
    println!("QR code: {}", s.qr_code);
}
