//! End-to-end resolver tests against a mock upstream.
//!
//! Every endpoint is pointed at one `MockServer`; call counts are verified when
//! the server is dropped.

use rain_core::{Config, EndpointConfig, GeoPoint, RainResolver};
use serde_json::json;
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEGACY_PATH: &str = "/mf3-rpc-portlet/rest/pluie/751010";
const FRAGMENT_PATH: &str = "/meteo/fragments/rain/city/75101";

const FRAGMENT: &str = r#"<div>
  <ol class="graphique-legend-list">
    <li class="rain1">Faible</li>
    <li class="rain2">Modéré</li>
  </ol>
  <ol class="graphique-graf-list">
    <li class="rain-1"></li>
    <li class="rain-2"></li>
  </ol>
</div>"#;

fn resolver_for(server: &MockServer) -> RainResolver {
    let config = Config {
        endpoints: EndpointConfig::with_base_url(&server.uri()),
        ..Config::default()
    };
    RainResolver::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_coordinates_session_dance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("set-cookie", "mfsession=abc; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/internet2018client/2.0/nowcast/rain"))
        .and(query_param("lat", "48.83237"))
        .and(query_param("lon", "2.35000"))
        .and(header("authorization", "Bearer nop"))
        .and(header("user-agent", "curl/7.68.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "forecast": [
                    { "time": "2020-05-28T14:25:00.000Z", "rain_intensity": 1, "rain_intensity_description": "Temps sec" },
                    { "time": "2020-05-28T14:30:00.000Z", "rain_intensity": 4, "rain_intensity_description": "Pluie forte" }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let forecast = resolver
        .resolve_by_coordinates(GeoPoint::new(48.83237, 2.35))
        .await
        .unwrap();

    assert_eq!(forecast.len(), 2);
    assert_eq!(forecast[0].rain_level, 1);
    assert_eq!(forecast[0].rain_level_text, "Temps sec");
    assert_eq!(forecast[1].rain_level, 4);
    assert_eq!(forecast[1].rain_level_text, "Pluie forte");
}

#[tokio::test]
async fn test_coordinates_without_cookie_stops_early() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(path("/internet2018client/2.0/nowcast/rain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    assert!(resolver.resolve_by_coordinates(GeoPoint::new(48.853, 2.35)).await.is_none());
}

#[tokio::test]
async fn test_municipality_primary_source_wins() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LEGACY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataCadran": [
                { "niveauPluieText": "Pas de précipitations", "niveauPluie": 1, "color": "ffffff" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(path(FRAGMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FRAGMENT))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let forecast = resolver.resolve_by_municipality("75101").await.unwrap();

    assert_eq!(forecast.len(), 1);
    assert_eq!(forecast[0].rain_level_text, "Pas de précipitations");
}

#[tokio::test]
async fn test_municipality_falls_back_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LEGACY_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(FRAGMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FRAGMENT))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let forecast = resolver.resolve_by_municipality("75101").await.unwrap();

    assert_eq!(forecast.len(), 2);
    assert_eq!(forecast[0].rain_level, 1);
    assert_eq!(forecast[0].rain_level_text, "Faible");
    assert_eq!(forecast[1].rain_level, 2);
    assert_eq!(forecast[1].rain_level_text, "Modéré");
}

#[tokio::test]
async fn test_municipality_both_sources_fail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mf3-rpc-portlet/rest/pluie/123456780"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/meteo/fragments/rain/city/12345678"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    assert!(resolver.resolve_by_municipality("12345678").await.is_none());
}

#[tokio::test]
async fn test_zip_code_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "postcode=75001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [ { "properties": { "citycode": "75101" } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LEGACY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(FRAGMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FRAGMENT))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let forecast = resolver.resolve_by_zip_code("75001").await.unwrap();
    assert_eq!(forecast.len(), 2);
}

#[tokio::test]
async fn test_invalid_input_issues_no_requests() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    assert!(resolver.resolve_by_municipality("").await.is_none());
    assert!(resolver.resolve_by_zip_code("").await.is_none());
    assert!(resolver
        .resolve_by_coordinates(GeoPoint::new(f64::INFINITY, 2.35))
        .await
        .is_none());
}
