//! Command-line front end for the review trend pipeline.
//!
//! Plays the role of the presentation boundary: issues queries through the
//! controller, feeds batches into the aggregator as they stream in, and
//! renders the bucketed averages and trend line once the stream completes.

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use tracing_subscriber::EnvFilter;

use reviewtrend::{
    Aggregator, ApiClient, DEFAULT_ACCURACY, GeoLocation, QueryController, QueryEvent,
    RecencyWindow, ReviewTarget, Settings, write_csv,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Review service base URL; overrides the configured default.
    #[arg(long, env = "REVIEWTREND_SERVER")]
    server: Option<String>,

    /// Origin latitude; with --longitude, skips the server origin lookup.
    #[arg(long)]
    latitude: Option<f64>,

    /// Origin longitude.
    #[arg(long)]
    longitude: Option<f64>,

    /// Origin accuracy in meters.
    #[arg(long, default_value_t = DEFAULT_ACCURACY)]
    accuracy: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the origin the server derives for this client.
    Origin,
    /// Search for a place around the origin.
    Search { query: String },
    /// Stream a place's reviews and print the rating trend.
    Trend {
        /// Place URL as returned by `search`.
        url: String,
        /// Recency window: all, 5y, 1y or 6m.
        #[arg(long)]
        window: Option<RecencyWindow>,
        /// Number of time buckets.
        #[arg(long)]
        buckets: Option<usize>,
        /// Also write the collected reviews to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load()?;
    let base_url = args
        .server
        .clone()
        .unwrap_or_else(|| settings.server.base_url.clone());
    let client = ApiClient::new(&base_url, Duration::from_secs(settings.server.timeout_secs))?;

    match &args.command {
        Command::Origin => match client.origin().await? {
            Some(origin) => println!("{}, {}", origin.latitude, origin.longitude),
            None => println!("no origin available"),
        },
        Command::Search { query } => {
            let location = resolve_origin(&client, &args).await?;
            let hits = client.search(query, &location).await?;
            if hits.is_empty() {
                println!("no places found for '{}'", query);
            }
            for hit in hits {
                println!("{}", hit.name);
                println!("    {}", hit.url);
                for line in hit.extra {
                    println!("    {}", line);
                }
            }
        }
        Command::Trend {
            url,
            window,
            buckets,
            csv,
        } => {
            let location = resolve_origin(&client, &args).await?;
            let window = window.unwrap_or(settings.trend.window);
            let buckets = buckets.unwrap_or(settings.trend.buckets);
            run_trend(client, location, url.clone(), window, buckets, csv.clone()).await?;
        }
    }
    Ok(())
}

/// Explicit flags win; otherwise ask the server for an origin.
async fn resolve_origin(client: &ApiClient, args: &Args) -> Result<GeoLocation, Box<dyn Error>> {
    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        return Ok(GeoLocation {
            latitude,
            longitude,
            accuracy: args.accuracy,
        });
    }
    match client.origin().await? {
        Some(origin) => Ok(origin),
        None => Err("no origin: pass --latitude/--longitude or configure the service".into()),
    }
}

async fn run_trend(
    client: ApiClient,
    location: GeoLocation,
    url: String,
    window: RecencyWindow,
    buckets: usize,
    csv_path: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let (mut controller, mut events) = QueryController::new(client);
    let mut aggregator = Aggregator::new(window, buckets);
    controller.start(ReviewTarget { url, location });

    while let Some(event) = events.next().await {
        match event {
            QueryEvent::Started => {
                // A new query owns the working set from scratch.
                aggregator.reset();
                eprintln!("streaming reviews...");
            }
            QueryEvent::Batch(items) => {
                aggregator.append(items);
                eprint!("\r{} reviews", aggregator.items().len());
            }
            QueryEvent::Finished => {
                eprintln!();
                break;
            }
            QueryEvent::Failed(message) => {
                eprintln!();
                return Err(message.into());
            }
        }
    }

    print_summary(&aggregator);

    if let Some(path) = csv_path {
        write_csv(aggregator.items(), File::create(&path)?)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(aggregator: &Aggregator) {
    let summary = aggregator.summary();
    if summary.averages.is_empty() {
        println!("no reviews in the selected window");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["bucket", "average rating"]);
    for average in &summary.averages {
        table.add_row([format_date(average.timestamp), format!("{:.2}", average.rating)]);
    }
    println!("{}", table);

    // Slope is per normalized span: the total rating change across the
    // displayed range.
    println!(
        "trend: {:+.2} over the range (baseline {:.2})",
        summary.fit.slope, summary.fit.bias
    );
}

fn format_date(timestamp: f64) -> String {
    match DateTime::from_timestamp(timestamp.round() as i64, 0) {
        Some(when) => when.format("%Y-%m-%d").to_string(),
        None => format!("{}", timestamp),
    }
}
