use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Text};
use rain_core::{Config, GeoPoint, LocationConfig, RainForecast, RainResolver, sun};
use tracing::{debug, warn};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "rain", version, about = "Rain nowcast for French locations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the default location and HTTP timeouts.
    Configure,

    /// Show the rain nowcast for a location.
    Show {
        #[command(flatten)]
        location: LocationArgs,

        /// Print the forecast as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the next sunrise and sunset, in local time.
    Sun {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
}

/// Where to look. Falls back to the `[location]` config section when empty.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// INSEE municipality code, e.g. 75101.
    #[arg(long, conflicts_with_all = ["zip", "lat", "lon"])]
    insee: Option<String>,

    /// Postal code, e.g. 75001.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    zip: Option<String>,

    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Insee(String),
    Zip(String),
    Gps(GeoPoint),
}

impl LocationArgs {
    fn target(&self, defaults: &LocationConfig) -> Option<Target> {
        if let Some(code) = &self.insee {
            return Some(Target::Insee(code.clone()));
        }
        if let Some(zip) = &self.zip {
            return Some(Target::Zip(zip.clone()));
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return Some(Target::Gps(GeoPoint::new(lat, lon)));
        }

        defaults
            .insee_code
            .clone()
            .map(Target::Insee)
            .or_else(|| defaults.zip_code.clone().map(Target::Zip))
            .or_else(|| defaults.geo_point().map(Target::Gps))
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, json } => {
                let config = Config::load()?;
                let target = location.target(&config.location).ok_or_else(|| {
                    anyhow!(
                        "No location given.\n\
                         Hint: pass --insee, --zip or --lat/--lon, or run `rain configure`."
                    )
                })?;

                let resolver = RainResolver::from_config(&config)
                    .context("Failed to build HTTP client")?;
                debug!(?target, "resolving rain");
                let forecast = match &target {
                    Target::Insee(code) => resolver.resolve_by_municipality(code).await,
                    Target::Zip(zip) => resolver.resolve_by_zip_code(zip).await,
                    Target::Gps(point) => resolver.resolve_by_coordinates(*point).await,
                };

                print_forecast(forecast.as_ref(), json)
            }
            Command::Sun { lat, lon } => {
                let config = Config::load()?;
                let point = match (lat, lon) {
                    (Some(lat), Some(lon)) => GeoPoint::new(lat, lon),
                    _ => config.location.geo_point().ok_or_else(|| {
                        anyhow!(
                            "No coordinates given.\n\
                             Hint: pass --lat/--lon, or run `rain configure`."
                        )
                    })?,
                };

                let now = Local::now();
                let sunrise = sun::next_sunrise(point, &now)
                    .ok_or_else(|| anyhow!("Could not compute sunrise for {point:?}"))?;
                let sunset = sun::next_sunset(point, &now)
                    .ok_or_else(|| anyhow!("Could not compute sunset for {point:?}"))?;

                println!("Next sunrise: {}", sunrise.format("%Y-%m-%d %H:%M"));
                println!("Next sunset:  {}", sunset.format("%Y-%m-%d %H:%M"));
                Ok(())
            }
        }
    }
}

fn print_forecast(forecast: Option<&RainForecast>, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&forecast).context("Failed to serialize forecast")?;
        println!("{out}");
        return Ok(());
    }

    let Some(forecast) = forecast else {
        warn!("every rain source came back empty-handed");
        println!("No rain forecast available.");
        return Ok(());
    };

    if forecast.is_empty() {
        println!("The source returned an empty forecast.");
    }
    for (i, entry) in forecast.iter().enumerate() {
        let when = entry.timestamp.clone().unwrap_or_else(|| format!("#{}", i + 1));
        println!("{when:<26} {} {}", entry.rain_level, entry.rain_level_text);
    }
    Ok(())
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let zip = Text::new("Default postal code (empty for none):")
        .with_initial_value(cfg.location.zip_code.as_deref().unwrap_or(""))
        .prompt()?;
    cfg.location.zip_code = non_empty(zip);

    let insee = Text::new("Default INSEE code (empty for none, takes precedence):")
        .with_initial_value(cfg.location.insee_code.as_deref().unwrap_or(""))
        .prompt()?;
    cfg.location.insee_code = non_empty(insee);

    let lat = Text::new("Latitude (empty for none):")
        .with_initial_value(&coordinate_text(cfg.location.lat))
        .prompt()?;
    let lon = Text::new("Longitude (empty for none):")
        .with_initial_value(&coordinate_text(cfg.location.lon))
        .prompt()?;
    set_coordinates(&mut cfg.location, &lat, &lon)?;

    cfg.http.timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(cfg.http.timeout_secs)
        .prompt()?;
    cfg.http.connect_timeout_secs = CustomType::<u64>::new("Connect timeout (seconds):")
        .with_default(cfg.http.connect_timeout_secs)
        .prompt()?;

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn coordinate_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Both empty clears the saved point; otherwise both must form a valid point.
fn set_coordinates(location: &mut LocationConfig, lat: &str, lon: &str) -> Result<()> {
    match (non_empty(lat.to_string()), non_empty(lon.to_string())) {
        (None, None) => {
            location.lat = None;
            location.lon = None;
        }
        (Some(lat), Some(lon)) => {
            let lat: f64 = lat.parse().with_context(|| format!("Invalid latitude '{lat}'"))?;
            let lon: f64 = lon.parse().with_context(|| format!("Invalid longitude '{lon}'"))?;
            GeoPoint::new(lat, lon).validate()?;
            location.lat = Some(lat);
            location.lon = Some(lon);
        }
        _ => {
            return Err(anyhow!(
                "Latitude and longitude must be given together (or both left empty)."
            ));
        }
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
