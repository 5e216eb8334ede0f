//! Air Sentinel - Air Quality Relay and Feed Binary
//!
//! Runs the relay server, watches a live feed from the terminal, or computes
//! an index from raw concentrations.

use air_sentinel::relay::default_source;
use air_sentinel::{
    calculate_aqi, get_aqi_category, start_relay_server, AirQualityReading, ConnectionState, FeedClient,
    FeedConfig, RelayConfig, StaticToken, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_RELAY_PORT,
    DEFAULT_UPDATE_INTERVAL_SECS, MAX_RECONNECT_ATTEMPTS, TOKEN_ENV_VAR,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::future::Future;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "air_sentinel")]
#[command(about = "Air Sentinel - air quality index and live feed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Compute air quality indices, serve a live WebSocket feed, or watch one")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server (default)
    Serve(ServeArgs),

    /// Connect to a feed and print readings as they arrive
    Watch(WatchArgs),

    /// Compute the index for PM2.5, PM10 and NO2 concentrations
    Aqi(AqiArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Relay bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Relay port
    #[arg(short, long, default_value_t = DEFAULT_RELAY_PORT)]
    port: u16,

    /// Seconds between pushed updates
    #[arg(long, default_value_t = DEFAULT_UPDATE_INTERVAL_SECS)]
    update_interval: u64,

    /// Seconds a reading is reused for the same location
    #[arg(long, default_value_t = DEFAULT_UPDATE_INTERVAL_SECS)]
    cache_ttl: u64,

    /// Accepted feed token (repeatable); any token is accepted if none given
    #[arg(long = "token")]
    tokens: Vec<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_RELAY_PORT,
            update_interval: DEFAULT_UPDATE_INTERVAL_SECS,
            cache_ttl: DEFAULT_UPDATE_INTERVAL_SECS,
            tokens: Vec::new(),
            no_cors: false,
        }
    }
}

#[derive(Args)]
struct WatchArgs {
    /// Feed endpoint
    #[arg(long, default_value_t = FeedConfig::default().url)]
    url: String,

    /// Auth token
    #[arg(long, env = TOKEN_ENV_VAR)]
    token: Option<String>,

    /// Latitude to subscribe to
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude to subscribe to
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Initial reconnect delay in milliseconds
    #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
    reconnect_delay: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = MAX_RECONNECT_ATTEMPTS)]
    max_retries: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Args)]
struct AqiArgs {
    /// PM2.5 concentration (µg/m³)
    pm25: f64,
    /// PM10 concentration (µg/m³)
    pm10: f64,
    /// NO2 concentration (ppb)
    no2: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match cli.command {
        Some(Commands::Serve(args)) => serve_command(args).await,
        Some(Commands::Watch(args)) => watch_command(args).await,
        Some(Commands::Aqi(args)) => {
            aqi_command(&args);
            Ok(())
        }
        None => serve_command(ServeArgs::default()).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    println!("Air Sentinel relay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::new(&args.host, args.port)
        .with_cors(!args.no_cors)
        .with_update_interval_secs(args.update_interval)
        .with_cache_ttl_secs(args.cache_ttl)
        .with_tokens(args.tokens);

    info!("Relay configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - CORS enabled: {}", config.enable_cors);
    info!("  - Update interval: {}s", config.update_interval_secs);
    info!("  - Cache TTL: {}s", config.cache_ttl_secs);
    info!("  - Token allow-list: {} entries", config.tokens.len());

    let source = default_source(&config);
    start_relay_server(config, source)
        .await
        .context("relay server stopped")
}

async fn watch_command(args: WatchArgs) -> anyhow::Result<()> {
    let config = FeedConfig::new(&args.url)
        .with_reconnect_base_delay_ms(args.reconnect_delay)
        .with_max_reconnect_attempts(args.max_retries);

    let credentials = match args.token {
        Some(token) => StaticToken::new(token),
        None => StaticToken::none(),
    };
    let client = FeedClient::new(config, credentials);

    let format = args.format;
    client.subscribe(move |reading| match format {
        OutputFormat::Json => match serde_json::to_string(reading) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to encode reading: {}", e),
        },
        OutputFormat::Pretty => print_pretty_reading(reading),
    });
    client.on_error(|e| eprintln!("feed error: {}", e));

    follow_location(&client, args.lat, args.lon, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;
    Ok(())
}

/// Connect and send the location every time a socket opens, until `stop`
/// completes or the client gives up.
async fn follow_location(client: &FeedClient, lat: f64, lon: f64, stop: impl Future<Output = ()>) {
    let mut states = client.state_changes();
    client.connect();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Open => client.update_location(lat, lon),
                    ConnectionState::Failed | ConnectionState::Disconnected => break,
                    ConnectionState::Connecting => {}
                }
            }
        }
    }

    client.disconnect();
}

fn aqi_command(args: &AqiArgs) {
    let aqi = calculate_aqi(args.pm25, args.pm10, args.no2);
    let category = get_aqi_category(f64::from(aqi));
    println!("AQI: {}", aqi);
    println!("Category: {} ({})", category.category, category.color);
    println!("{}", category.description);
}

fn print_pretty_reading(reading: &AirQualityReading) {
    let category = get_aqi_category(reading.aqi);
    println!("AQI {:.0} - {} [{}]", reading.aqi, category.category, reading.timestamp);
    if let Some(location) = &reading.location {
        println!("  Location: {:.4}, {:.4}", location.lat, location.lon);
    }
    let c = &reading.components;
    println!(
        "  PM2.5 {:.1}  PM10 {:.1}  NO2 {:.1}  O3 {:.1}  SO2 {:.1}  CO {:.1}",
        c.pm2_5, c.pm10, c.no2, c.o3, c.so2, c.co
    );
}
