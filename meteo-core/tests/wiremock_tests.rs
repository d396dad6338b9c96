//! Integration tests for the Open-Meteo client against a mock HTTP server.

use std::time::Duration;

use meteo_core::{
    Config, OpenMeteoClient, WeatherClient, WeatherCondition, WeatherError, client_from_config,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const FORECAST_PATH: &str = "/v1/forecast";

fn sample_current_response() -> serde_json::Value {
    serde_json::json!({
        "latitude": 39.875,
        "longitude": 116.375,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "timezone_abbreviation": "GMT",
        "elevation": 49.0,
        "current_units": {
            "time": "iso8601",
            "interval": "seconds",
            "temperature_2m": "°C",
            "relative_humidity_2m": "%",
            "wind_speed_10m": "m/s"
        },
        "current": {
            "time": "2024-01-15T12:00",
            "interval": 900,
            "temperature_2m": -2.3,
            "relative_humidity_2m": 31,
            "apparent_temperature": -6.8,
            "precipitation": 0.0,
            "rain": 0.0,
            "showers": 0.0,
            "snowfall": 0.0,
            "weather_code": 0,
            "cloud_cover": 12,
            "pressure_msl": 1031.4,
            "surface_pressure": 1025.2,
            "wind_speed_10m": 3.4,
            "wind_direction_10m": 315,
            "wind_gusts_10m": 8.1
        }
    })
}

fn create_test_client(mock_server: &MockServer) -> OpenMeteoClient {
    OpenMeteoClient::new(
        format!("{}{FORECAST_PATH}", mock_server.uri()),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .expect("Failed to create client")
}

async fn setup_forecast_mock(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn fetch_current_weather_success() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(sample_current_response()),
    )
    .await;

    let client = create_test_client(&mock_server);
    let obs = client
        .fetch_current_weather(39.9042, 116.4074)
        .await
        .expect("Expected success");

    assert_eq!(obs.latitude, 39.875);
    assert_eq!(obs.longitude, 116.375);
    assert_eq!(obs.temperature_celsius, Some(-2.3));
    assert_eq!(obs.apparent_temperature_celsius, Some(-6.8));
    assert_eq!(obs.relative_humidity_percent, Some(31.0));
    assert_eq!(obs.cloud_cover_percent, Some(12.0));
    assert_eq!(obs.wind_speed_meters_per_second, Some(3.4));
    assert_eq!(obs.wind_direction_degrees, Some(315.0));
    assert_eq!(obs.pressure_msl_hectopascals, Some(1031.4));
    assert_eq!(obs.wind_gusts_meters_per_second, Some(8.1));
    assert_eq!(obs.condition(), Some(WeatherCondition::ClearSky));
    assert!(obs.observed_at.is_some());
}

#[tokio::test]
async fn request_contains_expected_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .and(query_param("latitude", "40.7128"))
        .and(query_param("longitude", "-74.0060"))
        .and(query_param(
            "current",
            "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,rain,\
             showers,snowfall,weather_code,cloud_cover,pressure_msl,surface_pressure,\
             wind_speed_10m,wind_direction_10m,wind_gusts_10m",
        ))
        .and(query_param("wind_speed_unit", "ms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_current_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.fetch_current_weather(40.7128, -74.006).await;

    assert!(result.is_ok(), "Expected success, got: {result:?}");
}

#[tokio::test]
async fn partial_current_block_leaves_fields_missing() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 52.52,
            "longitude": 13.42,
            "current": { "temperature_2m": 21.5, "relative_humidity_2m": null }
        })),
    )
    .await;

    let client = create_test_client(&mock_server);
    let obs = client.fetch_current_weather(52.52, 13.405).await.unwrap();

    assert_eq!(obs.temperature_celsius, Some(21.5));
    assert_eq!(obs.relative_humidity_percent, None);
    assert_eq!(obs.apparent_temperature_celsius, None);
    assert_eq!(obs.wind_speed_meters_per_second, None);
    assert_eq!(obs.pressure_msl_hectopascals, None);
}

#[tokio::test]
async fn not_found_is_http_status_error() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(&mock_server, ResponseTemplate::new(404)).await;

    let client = create_test_client(&mock_server);
    let result = client.fetch_current_weather(39.9042, 116.4074).await;

    assert!(
        matches!(result, Err(WeatherError::HttpStatus { code: 404, .. })),
        "Expected HttpStatus 404, got: {result:?}"
    );
}

#[tokio::test]
async fn bad_request_carries_provider_reason() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": true,
            "reason": "Cannot initialize WeatherVariable from invalid String value foo"
        })),
    )
    .await;

    let client = create_test_client(&mock_server);
    let err = client
        .fetch_current_weather(39.9042, 116.4074)
        .await
        .unwrap_err();

    match err {
        WeatherError::HttpStatus { code, reason } => {
            assert_eq!(code, 400);
            assert!(reason.contains("invalid String value"));
        }
        other => panic!("Expected HttpStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn non_200_success_status_is_still_an_error() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(&mock_server, ResponseTemplate::new(204)).await;

    let client = create_test_client(&mock_server);
    let result = client.fetch_current_weather(0.0, 0.0).await;

    assert!(matches!(result, Err(WeatherError::HttpStatus { code: 204, .. })));
}

#[tokio::test]
async fn truncated_body_is_parse_error() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(200).set_body_string(r#"{"latitude": 39.875, "current": {"tempera"#),
    )
    .await;

    let client = create_test_client(&mock_server);
    let result = client.fetch_current_weather(39.9042, 116.4074).await;

    assert!(
        matches!(result, Err(WeatherError::Parse(_))),
        "Expected Parse, got: {result:?}"
    );
}

#[tokio::test]
async fn slow_response_is_transport_error() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(sample_current_response())
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let client = OpenMeteoClient::new(
        format!("{}{FORECAST_PATH}", mock_server.uri()),
        Duration::from_secs(1),
        Duration::from_millis(500),
    )
    .unwrap();
    let result = client.fetch_current_weather(39.9042, 116.4074).await;

    assert!(
        matches!(result, Err(WeatherError::Transport(_))),
        "Expected Transport, got: {result:?}"
    );
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Nothing listens on port 1.
    let client = OpenMeteoClient::new(
        format!("http://127.0.0.1:1{FORECAST_PATH}"),
        Duration::from_secs(1),
        Duration::from_secs(1),
    )
    .unwrap();
    let result = client.fetch_current_weather(39.9042, 116.4074).await;

    assert!(
        matches!(result, Err(WeatherError::Transport(_))),
        "Expected Transport, got: {result:?}"
    );
}

#[tokio::test]
async fn invalid_coordinates_fail_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_current_response()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);

    let result = client.fetch_current_weather(91.0, 0.0).await;
    assert!(matches!(result, Err(WeatherError::InvalidCoordinates { .. })));

    let result = client.fetch_current_weather(0.0, -181.0).await;
    assert!(matches!(result, Err(WeatherError::InvalidCoordinates { .. })));
}

#[tokio::test]
async fn repeated_calls_are_independent() {
    let mock_server = MockServer::start().await;
    setup_forecast_mock(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(sample_current_response()),
    )
    .await;

    let config = Config {
        endpoint: format!("{}{FORECAST_PATH}", mock_server.uri()),
        ..Default::default()
    };
    let client = client_from_config(&config).unwrap();

    let (a, b) = tokio::join!(
        client.fetch_current_weather(39.9042, 116.4074),
        client.fetch_current_weather(40.7128, -74.006),
    );

    assert_eq!(a.unwrap().temperature_celsius, Some(-2.3));
    assert_eq!(b.unwrap().temperature_celsius, Some(-2.3));
    assert_eq!(mock_server.received_requests().await.map(|r| r.len()), Some(2));
}
