use std::path::Path;
use std::sync::Arc;

use smartbin_storage::{NewPickupOrder, OrderStatus, RecordStore};

use crate::app::{build_storage, CliError};
use crate::config::SmartbinConfig;
use crate::{print_json, OutputFormat};

fn records(config_path: Option<&Path>) -> Result<Arc<dyn RecordStore>, CliError> {
    let config = SmartbinConfig::load(config_path)?;
    Ok(build_storage(&config).1)
}

pub(crate) async fn cmd_uploads(
    config_path: Option<&Path>,
    limit: usize,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let uploads = records(config_path)?.list_waste_uploads(limit).await?;
    match output {
        OutputFormat::Json => print_json(&uploads)?,
        OutputFormat::Text => {
            if uploads.is_empty() && !quiet {
                println!("No uploads");
            }
            for u in &uploads {
                let waste_type = u
                    .analysis
                    .get("wasteType")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                println!("{}  {}  {}  {}", u.id, u.uploaded_at, waste_type, u.image_url);
            }
        }
    }
    Ok(())
}

pub(crate) async fn cmd_create_order(
    config_path: Option<&Path>,
    order: NewPickupOrder,
    output: OutputFormat,
    _quiet: bool,
) -> Result<(), CliError> {
    let record = records(config_path)?.insert_pickup_order(order).await?;
    match output {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Text => println!("Order {} created ({})", record.id, record.status),
    }
    Ok(())
}

pub(crate) async fn cmd_list_orders(
    config_path: Option<&Path>,
    status: Option<OrderStatus>,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let orders = records(config_path)?.list_pickup_orders(status).await?;
    match output {
        OutputFormat::Json => print_json(&orders)?,
        OutputFormat::Text => {
            if orders.is_empty() && !quiet {
                println!("No orders");
            }
            for o in &orders {
                println!(
                    "{}  {}  {}  {}",
                    o.id,
                    o.status,
                    o.created_at,
                    o.pickup_address.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
