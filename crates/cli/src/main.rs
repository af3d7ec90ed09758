mod app;
mod commands;
mod config;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use smartbin_core::WeightUnit;
use smartbin_storage::OrderStatus;

use crate::app::CliError;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// SmartBin waste classification, rewards and pickup orders.
#[derive(Parser)]
#[command(
    name = "smartbin",
    version,
    about = "SmartBin waste classification, rewards and pickup orders"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the config file (default: ./smartbin.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an image, store it and credit the reward
    Deposit {
        /// Path to the waste image (JPEG, PNG, GIF or WebP)
        image: PathBuf,
        /// Weight of the deposit; omitted means a placeholder reading
        #[arg(long)]
        weight: Option<f64>,
        /// Unit of --weight (g or kg)
        #[arg(long, default_value = "g")]
        unit: WeightUnit,
        /// Quality in percent (default from config)
        #[arg(long)]
        quality: Option<u8>,
        /// Pickup latitude (requires --lng)
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Pickup longitude (requires --lat)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Classify an image without storing anything
    Classify {
        /// Path to the waste image
        image: PathBuf,
    },

    /// Ask the EcoBot assistant a question
    Chat {
        /// The message to send
        message: String,
        /// Extra context prepended to the prompt
        #[arg(long)]
        context: Option<String>,
    },

    /// Compute the coin reward for a weight and quality, offline
    Reward {
        /// Weight as typed, e.g. 500 or 1.5
        #[arg(long)]
        weight: String,
        /// Unit of --weight (g or kg)
        #[arg(long, default_value = "g")]
        unit: WeightUnit,
        /// Quality in percent (default from config)
        #[arg(long)]
        quality: Option<u8>,
    },

    /// Manage the signed-in user's session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List stored waste uploads, newest first
    Uploads {
        /// Maximum number of rows (0 = all)
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Create and list pickup orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Start the SmartBin HTTP API server
    Serve {
        /// Port to listen on (default from config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a session for a username or email address
    Login {
        /// Username or email
        identity: String,
    },
    /// Show the current balance
    Show,
    /// Spend coins from the balance
    Spend {
        /// Number of coins
        coins: u64,
    },
    /// End the session and delete its file
    Logout,
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Request a pickup
    Create {
        /// Upload this pickup is for
        #[arg(long)]
        upload_id: Option<String>,
        /// Estimated weight in grams
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Street address for the driver
        #[arg(long)]
        address: Option<String>,
        /// Free-form instructions
        #[arg(long)]
        notes: Option<String>,
    },
    /// List orders, newest first
    List {
        /// Only orders in this status
        #[arg(long)]
        status: Option<OrderStatus>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.quiet) {
        (_, true) => "error",
        (Commands::Serve { .. }, false) => "info",
        _ => "warn",
    };
    logging::init(default_level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let Cli {
        output,
        quiet,
        config,
        command,
    } = cli;

    let result = rt.block_on(async move {
        match command {
            Commands::Deposit {
                image,
                weight,
                unit,
                quality,
                lat,
                lng,
            } => {
                let args = commands::deposit::DepositArgs {
                    image,
                    weight: match weight {
                        Some(w) => commands::deposit::WeightArg::Given(unit.to_grams(w)),
                        None => commands::deposit::WeightArg::Absent,
                    },
                    quality,
                    location: lat.zip(lng),
                };
                commands::deposit::cmd_deposit(config.as_deref(), args, output, quiet).await
            }
            Commands::Classify { image } => {
                commands::classify::cmd_classify(config.as_deref(), &image, output, quiet).await
            }
            Commands::Chat { message, context } => {
                commands::chat::cmd_chat(
                    config.as_deref(),
                    &message,
                    context.as_deref(),
                    output,
                    quiet,
                )
                .await
            }
            Commands::Reward {
                weight,
                unit,
                quality,
            } => commands::reward::cmd_reward(config.as_deref(), &weight, unit, quality, output, quiet),
            Commands::Session { command } => {
                let action = match command {
                    SessionCommands::Login { identity } => {
                        commands::session::SessionAction::Login(identity)
                    }
                    SessionCommands::Show => commands::session::SessionAction::Show,
                    SessionCommands::Spend { coins } => {
                        commands::session::SessionAction::Spend(coins)
                    }
                    SessionCommands::Logout => commands::session::SessionAction::Logout,
                };
                commands::session::cmd_session(config.as_deref(), action, output, quiet)
            }
            Commands::Uploads { limit } => {
                commands::orders::cmd_uploads(config.as_deref(), limit, output, quiet).await
            }
            Commands::Orders { command } => match command {
                OrderCommands::Create {
                    upload_id,
                    weight,
                    lat,
                    lng,
                    address,
                    notes,
                } => {
                    let order = smartbin_storage::NewPickupOrder {
                        waste_upload_id: upload_id,
                        status: OrderStatus::Pending,
                        estimated_weight_grams: weight,
                        latitude: lat,
                        longitude: lng,
                        pickup_address: address,
                        special_instructions: notes,
                    };
                    commands::orders::cmd_create_order(config.as_deref(), order, output, quiet)
                        .await
                }
                OrderCommands::List { status } => {
                    commands::orders::cmd_list_orders(config.as_deref(), status, output, quiet)
                        .await
                }
            },
            Commands::Serve { port } => serve::run(config.as_deref(), port).await,
        }
    });

    if let Err(e) = result {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Usage(format!("serialization: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Report an error to stderr in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
