use std::{path::PathBuf, process};

use chrono::Utc;
use clap::Parser;
use log::{error, LevelFilter};

use signup::{FormField, Nominatim, Options, Position};

/// Sign up with a name and an address, filling city, state and zip from
/// the current location when one is given
#[derive(Parser)]
struct Cli {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    /// Latitude of the current location
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,
    /// Longitude of the current location
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,
    /// JSON file with recorded location fixes to play back
    #[arg(long, conflicts_with = "lat")]
    fixes: Option<PathBuf>,
    /// Directory for cached geocoder responses
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Nominatim reverse geocoding endpoint
    #[arg(long, default_value_t = String::from(Nominatim::DEFAULT_ENDPOINT))]
    endpoint: String,
    /// Sent to the geocoder; Nominatim's usage policy asks for one naming the application
    #[arg(long, default_value_t = String::from("signup-form v0.1.0"))]
    user_agent: String,
    #[arg(short, long, action)]
    verbose: bool,
}

fn main() {
    let args = Cli::parse();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();

    let fixes = match (&args.fixes, args.lat, args.lon) {
        (Some(path), _, _) => match signup::read_fixes(path) {
            Ok(fixes) => fixes,
            Err(e) => {
                error!("{}", e);
                process::exit(2);
            }
        },
        (None, Some(lat), Some(lon)) => vec![Position::new(lat, lon, Utc::now())],
        _ => Vec::new(),
    };

    let fields = [
        (FormField::FirstName, args.first_name),
        (FormField::LastName, args.last_name),
        (FormField::Street, args.street),
        (FormField::City, args.city),
        (FormField::State, args.state),
        (FormField::Zip, args.zip),
    ]
    .into_iter()
    .filter_map(|(field, text)| text.map(|text| (field, text)))
    .collect();

    let options = Options {
        fields,
        fixes,
        cache_dir: args.cache_dir,
        endpoint: args.endpoint,
        user_agent: args.user_agent,
    };

    match signup::run(options) {
        Ok(alert) => {
            println!("{}\n{}", alert.title, alert.message);
            if !alert.is_success() {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    }
}
