//! Cropsight CLI - crop recommendation and plant disease services

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
#[cfg(target_os = "linux")]
use tokio::io::BufReader;
#[cfg(target_os = "linux")]
use tokio::sync::watch;
use tracing::info;

use cropsight_cli::client::PredictionClient;
use cropsight_cli::config::{Config, MonitorConfig};
#[cfg(target_os = "linux")]
use cropsight_cli::monitor::{open_sensor, send_reset, HeightMonitor};
use cropsight_cli::soil_api::soil_routes;
use cropsight_cli::symptom_api::symptom_routes;
use cropsight_cli::{init_logging, load_soil_bundle, load_symptom_bundle};
use cropsight_model::{artifact, SoilReading};

#[derive(Parser)]
#[command(name = "cropsight")]
#[command(version)]
#[command(about = "Cropsight - crop recommendation and plant disease detection", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, global = true, env = "CROPSIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crop recommendation service
    SoilServer {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the disease detection service
    SymptomServer {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ask a remote crop recommendation service for a crop
    Recommend {
        /// Server URL (e.g. http://localhost:8000)
        #[arg(long, env = "CROPSIGHT_SOIL_SERVER", default_value = "http://127.0.0.1:8000")]
        server: String,

        /// Nitrogen
        #[arg(long = "n")]
        nitrogen: f64,

        /// Phosphorus
        #[arg(long = "p")]
        phosphorus: f64,

        /// Potassium
        #[arg(long = "k")]
        potassium: f64,

        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        #[arg(long)]
        humidity: f64,

        #[arg(long)]
        ph: f64,

        #[arg(long)]
        rainfall: f64,
    },

    /// Ask a remote disease detection service for a diagnosis
    Diagnose {
        /// Server URL (e.g. http://localhost:5000)
        #[arg(long, env = "CROPSIGHT_SYMPTOM_SERVER", default_value = "http://127.0.0.1:5000")]
        server: String,

        /// Free-text symptom description
        symptoms: String,
    },

    /// Fetch the market price listing
    MarketPrices {
        /// Server URL of a crop recommendation service
        #[arg(long, env = "CROPSIGHT_SOIL_SERVER", default_value = "http://127.0.0.1:8000")]
        server: String,
    },

    /// Load a model artifact and print what it holds
    Inspect {
        /// Path to the artifact file
        file: PathBuf,
    },

    /// Stream readings from the plant height sensor
    Monitor {
        /// Serial device path (overrides config)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Reset the servos before monitoring
        #[arg(long)]
        reset: bool,
    },

    /// Generate an example configuration file
    ConfigGen {
        /// Output format (yaml, toml)
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::SoilServer { port, bind } => {
            let mut settings = config.soil;
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(bind) = bind {
                settings.bind = bind;
            }

            let bind_addr: std::net::IpAddr = settings
                .bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", settings.bind, e))?;

            let bundle = load_soil_bundle(&settings);
            let routes = soil_routes(bundle, &settings.cors_origins);

            info!("Crop recommendation service listening on {}:{}", bind_addr, settings.port);
            warp::serve(routes).run((bind_addr, settings.port)).await;
        }

        Commands::SymptomServer { port, bind } => {
            let mut settings = config.symptom;
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(bind) = bind {
                settings.bind = bind;
            }

            let bind_addr: std::net::IpAddr = settings
                .bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", settings.bind, e))?;

            let bundle = load_symptom_bundle(&settings);
            let routes = symptom_routes(bundle);

            info!("Disease detection service listening on {}:{}", bind_addr, settings.port);
            warp::serve(routes).run((bind_addr, settings.port)).await;
        }

        Commands::Recommend {
            server,
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
        } => {
            let reading = SoilReading {
                nitrogen,
                phosphorus,
                potassium,
                temperature,
                humidity,
                ph,
                rainfall,
            };
            let client = PredictionClient::new(&server);
            let crop = client.recommend_crop(&reading).await?;
            println!("Recommended crop: {}", crop);
        }

        Commands::Diagnose { server, symptoms } => {
            let client = PredictionClient::new(&server);
            let diagnosis = client.diagnose(&symptoms).await?;
            println!("Disease:   {}", diagnosis.disease);
            println!("Treatment: {}", diagnosis.treatment);
        }

        Commands::MarketPrices { server } => {
            let client = PredictionClient::new(&server);
            let prices = client.market_prices().await?;
            println!("{:<10} {:>8} {:<8} {:>7}  TREND", "CROP", "PRICE", "UNIT", "CHANGE");
            for p in prices {
                println!(
                    "{:<10} {:>8} {:<8} {:>7}  {}",
                    p.crop, p.price, p.unit, p.change, p.trending
                );
            }
        }

        Commands::Inspect { file } => {
            let summary = artifact::inspect(&file)?;
            println!("Artifact: {}", file.display());
            println!("  Kind:     {}", summary.kind);
            println!("  Version:  {}", summary.version);
            if let Some(variant) = &summary.variant {
                println!("  Variant:  {}", variant);
            }
            if let Some(features) = summary.features {
                println!("  Features: {}", features);
            }
            if !summary.labels.is_empty() {
                println!("  Labels ({}):", summary.labels.len());
                for label in &summary.labels {
                    println!("    - {}", label);
                }
            }
        }

        Commands::Monitor { device, reset } => {
            let mut settings = config.monitor;
            if let Some(device) = device {
                settings.device = device;
            }

            run_monitor(settings, reset).await?;
        }

        Commands::ConfigGen { format, output } => {
            let content = match format.to_lowercase().as_str() {
                "yaml" | "yml" => Config::example_yaml(),
                "toml" => Config::example_toml(),
                _ => anyhow::bail!("Unsupported format: {}. Use 'yaml' or 'toml'", format),
            };

            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!("Configuration written to: {}", path.display());
            } else {
                println!("{}", content);
            }
        }
    }

    Ok(())
}

#[cfg(target_os = "linux")]
async fn run_monitor(settings: MonitorConfig, reset: bool) -> Result<()> {
    let (reader, mut writer) = open_sensor(&settings.device)?;
    if reset {
        send_reset(&mut writer).await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    info!("Monitoring plant height on {}", settings.device.display());
    let mut monitor = HeightMonitor::from_config(&settings);
    match monitor.run(BufReader::new(reader), shutdown_rx).await? {
        Some(stats) => println!(
            "Readings: {}  current {:.2}cm  avg {:.2}cm  min {:.2}cm  max {:.2}cm",
            stats.count, stats.current, stats.average, stats.min, stats.max
        ),
        None => println!("No readings received"),
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run_monitor(settings: MonitorConfig, _reset: bool) -> Result<()> {
    anyhow::bail!(
        "Cannot monitor {}: sensor access is only supported on Linux",
        settings.device.display()
    )
}
