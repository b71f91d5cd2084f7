use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::{collections::HashMap, sync::Arc};
use tracing::info;

use crate::{
    config::EndpointConfig,
    error::{RainError, Result},
    http::{Fetch, ok_body},
    model::{MunicipalityCode, RainForecast, RainForecastEntry},
};

use super::{ProviderId, RainSource, contain};

const LEGEND_LIST_CLASS: &str = "graphique-legend-list";
const SERIES_LIST_CLASS: &str = "graphique-graf-list";
const LEGEND_KEY_PREFIX: &str = "rain";
const SERIES_KEY_PREFIX: &str = "rain-";

/// Rain tier key to label, scoped to one fragment.
pub type Legend = HashMap<String, String>;

/// Orange: scrapes the rain chart fragment of a municipality page.
#[derive(Debug, Clone)]
pub struct OrangeClient {
    fetcher: Arc<dyn Fetch>,
    fragment_url: String,
}

impl OrangeClient {
    pub fn new(fetcher: Arc<dyn Fetch>, endpoints: &EndpointConfig) -> Self {
        Self {
            fetcher,
            fragment_url: endpoints.rain_fragment.trim_end_matches('/').to_string(),
        }
    }

    pub fn fragment_url_for(&self, code: &MunicipalityCode) -> String {
        format!("{}/{}", self.fragment_url, code)
    }

    pub async fn fetch_by_municipality(&self, code: &MunicipalityCode) -> Result<RainForecast> {
        let url = self.fragment_url_for(code);

        let res = self.fetcher.get(&url, &[]).await?;
        let body = ok_body(&url, res)?;

        let forecast = parse_rain_fragment(&body)?;
        info!(%code, entries = forecast.len(), "Orange rain by municipality");
        Ok(forecast)
    }
}

#[async_trait]
impl RainSource for OrangeClient {
    fn id(&self) -> ProviderId {
        ProviderId::Orange
    }

    async fn rain_by_municipality(&self, code: &MunicipalityCode) -> Option<RainForecast> {
        contain(self.id(), self.fetch_by_municipality(code).await)
    }
}

/// Reads the legend list first, then maps every series item through it.
///
/// Any structural problem fails the whole fragment: a missing list, a series
/// item without a `rain-N` class, or a tier the legend does not know.
pub fn parse_rain_fragment(markup: &str) -> Result<RainForecast> {
    let doc = Html::parse_fragment(markup);
    let ol = Selector::parse("ol").map_err(|err| RainError::Parse(err.to_string()))?;

    let mut legend_list = None;
    let mut series_list = None;
    for list in doc.select(&ol) {
        if has_class(list, LEGEND_LIST_CLASS) {
            legend_list.get_or_insert(list);
        }
        if has_class(list, SERIES_LIST_CLASS) {
            series_list.get_or_insert(list);
        }
    }

    let legend_list = legend_list
        .ok_or_else(|| RainError::Schema(format!("no <ol class=\"{LEGEND_LIST_CLASS}\">")))?;
    let series_list = series_list
        .ok_or_else(|| RainError::Schema(format!("no <ol class=\"{SERIES_LIST_CLASS}\">")))?;

    let legend = legend_from_list(legend_list);
    series_from_list(series_list, &legend)
}

/// Items without a `rain*` class carry no tier and are skipped.
pub fn legend_from_list(list: ElementRef<'_>) -> Legend {
    child_elements(list)
        .filter_map(|item| {
            let key = class_suffix(item, LEGEND_KEY_PREFIX)?;
            let label = item.text().collect::<String>().trim().to_string();
            Some((key.to_string(), label))
        })
        .collect()
}

pub fn series_from_list(list: ElementRef<'_>, legend: &Legend) -> Result<RainForecast> {
    child_elements(list)
        .map(|item| {
            let key = class_suffix(item, SERIES_KEY_PREFIX).ok_or_else(|| {
                RainError::Schema(format!("series item without a {SERIES_KEY_PREFIX}N class"))
            })?;
            let label = legend
                .get(key)
                .ok_or_else(|| RainError::LegendLookup(key.to_string()))?;
            let level = key
                .parse::<u8>()
                .map_err(|err| RainError::Parse(format!("rain tier '{key}': {err}")))?;
            Ok(RainForecastEntry::new(level, label.clone()))
        })
        .collect()
}

fn child_elements<'a>(list: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    list.children().filter_map(ElementRef::wrap)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn class_suffix<'a>(element: ElementRef<'a>, prefix: &str) -> Option<&'a str> {
    element
        .value()
        .classes()
        .find_map(|class| class.strip_prefix(prefix))
}
