use clap::{Args, Parser, Subcommand};
use floodwatch::annotator::Annotator;
use floodwatch::client::PredictionClient;
use floodwatch::config::Config;
use floodwatch::contact::ContactRelay;
use floodwatch::models::{AlertOutcome, StationListing, StationRecord};
use floodwatch::session::UploadSession;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "floodwatch")]
#[command(about = "Flood-risk predictions for meteorological stations", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config/config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every station in a CSV and print the resulting map state as JSON
    Annotate {
        /// CSV file with a header row
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Write the map state to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score a single manually entered station
    Predict(StationArgs),
    /// List known stations
    Stations,
    /// Show the rainfall and flood aggregates behind the charts
    Analysis,
    /// Show yearly and monthly rainfall/temperature for one station
    Series {
        #[arg(value_name = "STATION")]
        station: String,
    },
    /// Send an alert message
    Alert {
        #[arg(value_name = "MESSAGE")]
        message: String,
    },
    /// Send a message through the contact form relay
    Contact {
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Args)]
struct StationArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    latitude: f64,
    #[arg(long)]
    longitude: f64,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    month: Option<i32>,
    #[arg(long)]
    max_temp: Option<f64>,
    #[arg(long)]
    min_temp: Option<f64>,
    #[arg(long)]
    rainfall: Option<f64>,
    #[arg(long)]
    relative_humidity: Option<f64>,
    #[arg(long)]
    wind_speed: Option<f64>,
    #[arg(long)]
    cloud_coverage: Option<f64>,
    #[arg(long)]
    bright_sunshine: Option<f64>,
    #[arg(long)]
    station_number: Option<i32>,
    #[arg(long)]
    x_cor: Option<f64>,
    #[arg(long)]
    y_cor: Option<f64>,
    #[arg(long)]
    alt: Option<f64>,
    #[arg(long)]
    period: Option<f64>,
}

impl From<StationArgs> for StationRecord {
    fn from(args: StationArgs) -> Self {
        StationRecord {
            name: args.name.trim().to_string(),
            year: args.year,
            month: args.month,
            max_temp: args.max_temp,
            min_temp: args.min_temp,
            rainfall: args.rainfall,
            relative_humidity: args.relative_humidity,
            wind_speed: args.wind_speed,
            cloud_coverage: args.cloud_coverage,
            bright_sunshine: args.bright_sunshine,
            station_number: args.station_number,
            x_cor: args.x_cor,
            y_cor: args.y_cor,
            latitude: args.latitude,
            longitude: args.longitude,
            alt: args.alt,
            period: args.period,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,floodwatch=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {}\n\n\
             Make sure:\n\
             1. {} is valid YAML\n\
             2. All referenced environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            e,
            cli.config.display()
        )
    })?;
    info!("Configuration loaded");

    let client = PredictionClient::new(&config.api)?;

    match cli.command {
        Commands::Annotate { input, output } => {
            let content = std::fs::read(&input).map_err(|e| {
                anyhow::anyhow!("Failed to read {}: {}", input.display(), e)
            })?;

            let annotator = Annotator::new(
                Arc::new(client),
                config.annotator.max_concurrent_requests,
            );
            let mut session = UploadSession::new(annotator, config.map);
            let summary = session.process_upload(&content).await?;

            let document = json!({
                "summary": summary,
                "map": session.map(),
            });
            let rendered = serde_json::to_string_pretty(&document)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    info!("Map state written to {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }
        Commands::Predict(args) => {
            let record = StationRecord::from(args);
            match client.predict(&record).await {
                Ok(prediction) => {
                    println!(
                        "Flood Prediction: {}",
                        prediction.flood_prediction.as_deref().unwrap_or("Unknown")
                    );
                    println!("Risk Percentage: {:.2}%", prediction.risk_percentage);
                }
                Err(e) => error!("Error fetching prediction: {}", e),
            }
        }
        Commands::Stations => match client.list_stations().await {
            Ok(StationListing::Sites(sites)) => {
                for site in sites {
                    println!("{}\t{}\t{:.4}\t{:.4}", site.id, site.name, site.lat, site.lng);
                }
            }
            Ok(listing @ StationListing::Names { .. }) => {
                for name in listing.names() {
                    println!("{}", name);
                }
            }
            Err(e) => {
                error!("Error fetching stations: {}", e);
                println!("No data available.");
            }
        },
        Commands::Analysis => match client.analysis().await {
            Ok(analysis) if !analysis.is_empty() => {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
            Ok(_) => println!("No data available."),
            Err(e) => {
                error!("Error fetching data: {}", e);
                println!("No data available.");
            }
        },
        Commands::Series { station } => match client.station_series(&station).await {
            Ok(series) => println!("{}", serde_json::to_string_pretty(&series)?),
            Err(e) => {
                error!("Error fetching series for {}: {}", station, e);
                println!("No data available.");
            }
        },
        Commands::Alert { message } => match client.send_alert(&message).await {
            Ok(AlertOutcome::Delivered) => println!("Alert sent."),
            Ok(AlertOutcome::Rejected(status)) => println!("Alert not sent ({}).", status),
            Err(e) => {
                error!("Error sending alert: {}", e);
                println!("Alert not sent.");
            }
        },
        Commands::Contact { email, message } => {
            let contact = config.contact.as_ref().ok_or_else(|| {
                anyhow::anyhow!("No contact section in configuration; set contact.access_key")
            })?;
            let relay = ContactRelay::new(contact)?;
            match relay.submit(&email, &message).await {
                Ok(()) => println!("Thank you! Your message has been sent."),
                Err(e) => {
                    error!("Contact relay failed: {}", e);
                    println!("Something went wrong. Please try again.");
                }
            }
        }
    }

    Ok(())
}
