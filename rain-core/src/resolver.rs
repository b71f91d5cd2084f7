use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    error::Result,
    geocode::LocationResolver,
    http::{Fetch, ReqwestFetcher},
    model::{GeoPoint, MunicipalityCode, RainForecast},
    provider::{RainSource, sources_from_config},
};

/// Tries each source in priority order and returns the first forecast found.
///
/// Sources are queried one after the other, never concurrently, and results
/// are never merged.
#[derive(Debug)]
pub struct RainResolver {
    sources: Vec<Box<dyn RainSource>>,
    locations: LocationResolver,
}

impl RainResolver {
    pub fn new(sources: Vec<Box<dyn RainSource>>, locations: LocationResolver) -> Self {
        Self { sources, locations }
    }

    /// Wires every provider to `fetcher` using the configured endpoints.
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn Fetch>) -> Self {
        let locations = LocationResolver::new(fetcher.clone(), config.endpoints.geocode.clone());
        Self::new(sources_from_config(config, fetcher), locations)
    }

    /// Production wiring over `reqwest`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::new(&config.http)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub async fn resolve_by_municipality(&self, code: &str) -> Option<RainForecast> {
        let code = match MunicipalityCode::parse(code) {
            Ok(code) => code,
            Err(err) => {
                error!(error = %err, "rejected municipality lookup");
                return None;
            }
        };
        self.rain_for(&code).await
    }

    pub async fn resolve_by_coordinates(&self, point: GeoPoint) -> Option<RainForecast> {
        if let Err(err) = point.validate() {
            error!(error = %err, "rejected coordinate lookup");
            return None;
        }

        for source in &self.sources {
            if let Some(forecast) = source.rain_by_coordinates(point).await {
                info!(provider = %source.id(), "rain resolved by coordinates");
                return Some(forecast);
            }
            debug!(provider = %source.id(), "no coordinate data, trying next source");
        }
        None
    }

    pub async fn resolve_by_zip_code(&self, zip_code: &str) -> Option<RainForecast> {
        if zip_code.trim().is_empty() {
            error!("rejected zip code lookup: no zip code");
            return None;
        }

        let Some(code) = self.locations.municipality_for_zip(zip_code).await else {
            error!(zip_code, "no municipality code for zip code");
            return None;
        };
        self.rain_for(&code).await
    }

    async fn rain_for(&self, code: &MunicipalityCode) -> Option<RainForecast> {
        for source in &self.sources {
            if let Some(forecast) = source.rain_by_municipality(code).await {
                info!(provider = %source.id(), %code, "rain resolved by municipality");
                return Some(forecast);
            }
            debug!(provider = %source.id(), %code, "no data, trying next source");
        }
        None
    }
}
