use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::{error, warn};

use crate::{
    config::Config,
    error::{RainError, Result},
    http::Fetch,
    model::{GeoPoint, MunicipalityCode, RainForecast},
    provider::{meteofrance::MeteoFranceClient, orange::OrangeClient},
};

pub mod meteofrance;
pub mod orange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    MeteoFrance,
    Orange,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::MeteoFrance => "meteofrance",
            ProviderId::Orange => "orange",
        }
    }

    /// All providers, highest priority first.
    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::MeteoFrance, ProviderId::Orange]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rain data source. `None` means "nothing usable", whatever the reason;
/// the reason is logged, never returned.
#[async_trait]
pub trait RainSource: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn rain_by_municipality(&self, code: &MunicipalityCode) -> Option<RainForecast>;

    /// Sources without a coordinate endpoint keep the default.
    async fn rain_by_coordinates(&self, _point: GeoPoint) -> Option<RainForecast> {
        None
    }
}

/// Collapses a provider result into the `RainSource` contract, logging the failure.
pub(crate) fn contain(provider: ProviderId, result: Result<RainForecast>) -> Option<RainForecast> {
    match result {
        Ok(forecast) => Some(forecast),
        Err(err @ (RainError::Transport { .. } | RainError::EmptyBody { .. })) => {
            warn!(%provider, error = %err, "no rain data");
            None
        }
        Err(err) => {
            error!(%provider, error = %err, "no rain data");
            None
        }
    }
}

/// Construct a single source from config.
pub fn source_from_config(
    id: ProviderId,
    config: &Config,
    fetcher: Arc<dyn Fetch>,
) -> Box<dyn RainSource> {
    match id {
        ProviderId::MeteoFrance => Box::new(MeteoFranceClient::new(fetcher, &config.endpoints)),
        ProviderId::Orange => Box::new(OrangeClient::new(fetcher, &config.endpoints)),
    }
}

/// Every source, in fallback order.
pub fn sources_from_config(config: &Config, fetcher: Arc<dyn Fetch>) -> Vec<Box<dyn RainSource>> {
    ProviderId::all()
        .iter()
        .map(|id| source_from_config(*id, config, fetcher.clone()))
        .collect()
}
