//! Postal code to INSEE municipality code, via the national address API.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{
    error::{RainError, Result},
    http::{Fetch, truncate_body},
    model::MunicipalityCode,
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Option<FeatureProperties>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    citycode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    fetcher: Arc<dyn Fetch>,
    geocode_url: String,
}

impl LocationResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, geocode_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            geocode_url: geocode_url.into(),
        }
    }

    pub fn search_url_for(&self, zip_code: &str) -> String {
        format!("{}?q=postcode={}", self.geocode_url, zip_code)
    }

    /// City code of the first feature carrying `properties`, if that feature has one.
    pub async fn lookup(&self, zip_code: &str) -> Result<Option<MunicipalityCode>> {
        let zip_code = zip_code.trim();
        if zip_code.is_empty() {
            return Err(RainError::InvalidInput("no zip code".to_string()));
        }

        let url = self.search_url_for(zip_code);
        let res = self.fetcher.get(&url, &[]).await?;
        if !res.is_ok() {
            return Err(RainError::Transport {
                url,
                status: res.status,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&res.body).map_err(|err| {
            RainError::Parse(format!("{err} in {}", truncate_body(&res.body)))
        })?;

        let code = parsed
            .features
            .into_iter()
            .find_map(|feature| feature.properties)
            .and_then(|properties| properties.citycode)
            .map(|code| MunicipalityCode::parse(&code))
            .transpose()?;

        debug!(zip_code, code = ?code, "geocoded zip code");
        Ok(code)
    }

    /// Same as [`lookup`](Self::lookup), with every failure logged and collapsed to `None`.
    pub async fn municipality_for_zip(&self, zip_code: &str) -> Option<MunicipalityCode> {
        match self.lookup(zip_code).await {
            Ok(code) => code,
            Err(err @ RainError::Transport { .. }) => {
                warn!(error = %err, "geocoding failed");
                None
            }
            Err(err) => {
                error!(error = %err, "geocoding failed");
                None
            }
        }
    }
}
