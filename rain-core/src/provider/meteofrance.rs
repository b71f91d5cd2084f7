use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    config::EndpointConfig,
    error::{RainError, Result},
    http::{Fetch, ok_body, truncate_body},
    model::{GeoPoint, MunicipalityCode, RainForecast, RainForecastEntry},
    session::SessionTokenResolver,
};

use super::{ProviderId, RainSource, contain};

/// The nowcast API rejects unknown clients.
const USER_AGENT: &str = "curl/7.68.0";

/// Météo-France: authenticated JSON nowcast by coordinates, plus the legacy
/// unauthenticated endpoint by municipality code.
#[derive(Debug, Clone)]
pub struct MeteoFranceClient {
    fetcher: Arc<dyn Fetch>,
    session: SessionTokenResolver,
    nowcast_url: String,
    legacy_url: String,
}

impl MeteoFranceClient {
    pub fn new(fetcher: Arc<dyn Fetch>, endpoints: &EndpointConfig) -> Self {
        Self {
            session: SessionTokenResolver::new(fetcher.clone(), endpoints.session_portal.clone()),
            fetcher,
            nowcast_url: endpoints.nowcast.clone(),
            legacy_url: endpoints.legacy_rain.trim_end_matches('/').to_string(),
        }
    }

    pub fn nowcast_url_for(&self, point: GeoPoint) -> String {
        format!("{}?lat={:.5}&lon={:.5}", self.nowcast_url, point.lat, point.lon)
    }

    /// The upstream expects a literal `0` after the code.
    pub fn legacy_url_for(&self, code: &MunicipalityCode) -> String {
        format!("{}/{}0", self.legacy_url, code)
    }

    /// Fetches a fresh session token, then the nowcast for `point`.
    pub async fn fetch_by_coordinates(&self, point: GeoPoint) -> Result<RainForecast> {
        point.validate()?;

        let token = self.session.resolve().await?;
        let bearer = token.bearer();
        let url = self.nowcast_url_for(point);

        let res = self
            .fetcher
            .get(&url, &[("Authorization", bearer.as_str()), ("User-Agent", USER_AGENT)])
            .await?;
        let body = ok_body(&url, res)?;

        let forecast = parse_nowcast(&body)?;
        info!(entries = forecast.len(), "Météo-France nowcast by coordinates");
        Ok(forecast)
    }

    pub async fn fetch_by_municipality(&self, code: &MunicipalityCode) -> Result<RainForecast> {
        let url = self.legacy_url_for(code);

        let res = self.fetcher.get(&url, &[]).await?;
        let body = ok_body(&url, res)?;

        let forecast = parse_legacy(&body)?;
        info!(%code, entries = forecast.len(), "Météo-France rain by municipality");
        Ok(forecast)
    }
}

#[async_trait]
impl RainSource for MeteoFranceClient {
    fn id(&self) -> ProviderId {
        ProviderId::MeteoFrance
    }

    async fn rain_by_municipality(&self, code: &MunicipalityCode) -> Option<RainForecast> {
        contain(self.id(), self.fetch_by_municipality(code).await)
    }

    async fn rain_by_coordinates(&self, point: GeoPoint) -> Option<RainForecast> {
        contain(self.id(), self.fetch_by_coordinates(point).await)
    }
}

fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|err| RainError::Parse(format!("{err} in {}", truncate_body(body))))
}

/// `properties.forecast[]`, each record renamed into the shared shape.
fn parse_nowcast(body: &str) -> Result<RainForecast> {
    let mut doc = parse_json(body)?;

    let properties = match doc.get_mut("properties") {
        Some(Value::Null) | None => {
            return Err(RainError::Schema(format!(
                "no properties in {}",
                truncate_body(body)
            )));
        }
        Some(properties) => properties,
    };

    let records = match properties.get_mut("forecast").map(Value::take) {
        Some(Value::Array(records)) => records,
        _ => {
            return Err(RainError::Schema(format!(
                "no forecast in {}",
                truncate_body(body)
            )));
        }
    };

    records
        .into_iter()
        .map(|record| match record {
            Value::Object(record) => normalize_nowcast_record(record),
            other => Err(RainError::Schema(format!("forecast record is not an object: {other}"))),
        })
        .collect()
}

fn normalize_nowcast_record(record: Map<String, Value>) -> Result<RainForecastEntry> {
    let rain_level = record
        .get("rain_intensity")
        .and_then(Value::as_u64)
        .and_then(|level| u8::try_from(level).ok())
        .ok_or_else(|| RainError::Schema("forecast record without rain_intensity".into()))?;

    let rain_level_text = record
        .get("rain_intensity_description")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            RainError::Schema("forecast record without rain_intensity_description".into())
        })?
        .to_string();

    let timestamp = record.get("time").and_then(Value::as_str).map(str::to_string);

    Ok(RainForecastEntry {
        rain_level,
        rain_level_text,
        timestamp,
        extra: record,
    })
}

/// `dataCadran` is already in the shared shape.
fn parse_legacy(body: &str) -> Result<RainForecast> {
    let mut doc = parse_json(body)?;

    match doc.get_mut("dataCadran").map(Value::take) {
        Some(Value::Null) | None => Err(RainError::Schema(format!(
            "no dataCadran in {}",
            truncate_body(body)
        ))),
        Some(cadran) => {
            debug!("decoding dataCadran");
            serde_json::from_value(cadran)
                .map_err(|err| RainError::Schema(format!("unexpected dataCadran: {err}")))
        }
    }
}
