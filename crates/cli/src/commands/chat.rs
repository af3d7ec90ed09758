use std::path::Path;

use crate::app::{CliError, Services};
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

pub(crate) async fn cmd_chat(
    config_path: Option<&Path>,
    message: &str,
    context: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    if message.trim().is_empty() {
        return Err(CliError::Usage("message must not be empty".to_string()));
    }
    let services = Services::from_config(SmartbinConfig::load(config_path)?)?;
    let reply = services.assistant().ask(message, context).await;

    match output {
        OutputFormat::Json => print_json(&reply)?,
        OutputFormat::Text => {
            if reply.origin != "model" && !quiet {
                eprintln!("warning: assistant unavailable; showing a canned answer");
            }
            println!("{}", reply.response);
        }
    }
    Ok(())
}
