use floodwatch::client::PredictionClient;
use floodwatch::config::ApiConfig;
use floodwatch::error::AppError;
use floodwatch::models::{AlertOutcome, StationListing, StationRecord};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PredictionClient {
    let config = ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    };
    PredictionClient::new(&config).expect("Failed to create client")
}

/// Test that a record is posted with the column names the model expects
#[tokio::test]
async fn test_predict_posts_wire_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_partial_json(json!({
            "Station_Names": "Barisal",
            "Year": 1950,
            "Rainfall": 210.5,
            "LATITUDE": 22.7,
            "LONGITUDE": 90.36,
            "Max_Temp": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flood_prediction": "Yes",
            "risk_percentage": 73.12
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut record = StationRecord::new("Barisal", 22.7, 90.36);
    record.year = Some(1950);
    record.rainfall = Some(210.5);

    let prediction = client_for(&mock_server)
        .predict(&record)
        .await
        .expect("Prediction failed");

    assert_eq!(prediction.risk_percentage, 73.12);
    assert_eq!(prediction.flood_prediction.as_deref(), Some("Yes"));
}

/// The model reports its own failures as an error body with a 200 status
#[tokio::test]
async fn test_predict_error_body_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "model not loaded"})),
        )
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .predict(&StationRecord::new("Barisal", 22.7, 90.36))
        .await;

    match result {
        Err(AppError::Prediction(msg)) => assert!(msg.contains("model not loaded")),
        other => panic!("Expected Prediction error, got: {:?}", other),
    }
}

/// Non-success status surfaces as an HTTP error
#[tokio::test]
async fn test_predict_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .predict(&StationRecord::new("Barisal", 22.7, 90.36))
        .await;

    assert!(matches!(result, Err(AppError::Http(_))));
}

/// Retry logic with transient failures
#[tokio::test]
async fn test_predict_retries_on_server_error_when_enabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flood_prediction": "No",
            "risk_percentage": 12.0
        })))
        .mount(&mock_server)
        .await;

    let config = ApiConfig {
        base_url: mock_server.uri(),
        retries: 1,
        ..ApiConfig::default()
    };
    let client = PredictionClient::new(&config).unwrap();

    let prediction = client
        .predict(&StationRecord::new("Barisal", 22.7, 90.36))
        .await
        .expect("Retry should have recovered");
    assert_eq!(prediction.risk_percentage, 12.0);
}

/// Stalled calls are cut off by the configured timeout
#[tokio::test]
async fn test_predict_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"risk_percentage": 50.0}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = ApiConfig {
        base_url: mock_server.uri(),
        timeout_secs: 1,
        ..ApiConfig::default()
    };
    let client = PredictionClient::new(&config).unwrap();

    match client
        .predict(&StationRecord::new("Barisal", 22.7, 90.36))
        .await
    {
        Err(AppError::Http(e)) => assert!(e.is_timeout()),
        other => panic!("Expected timeout, got: {:?}", other),
    }
}

/// Listing endpoint returning full sites
#[tokio::test]
async fn test_list_stations_sites() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Sangli Station 1", "lat": 16.85, "lng": 74.57},
            {"id": 2, "name": "Sangli Station 2", "lat": 16.86, "lng": 74.58}
        ])))
        .mount(&mock_server)
        .await;

    let listing = client_for(&mock_server).list_stations().await.unwrap();
    match listing {
        StationListing::Sites(sites) => {
            assert_eq!(sites.len(), 2);
            assert_eq!(sites[1].id, 2);
            assert_eq!(sites[1].lng, 74.58);
        }
        other => panic!("Expected sites, got: {:?}", other),
    }
}

/// Listing endpoint returning bare names
#[tokio::test]
async fn test_list_stations_names() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"stations": ["Barisal", "Bhola"]})),
        )
        .mount(&mock_server)
        .await;

    let listing = client_for(&mock_server).list_stations().await.unwrap();
    assert_eq!(listing.names(), vec!["Barisal", "Bhola"]);
}

/// Chart aggregates decode from the analysis endpoint
#[tokio::test]
async fn test_analysis() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stations": [{"Station_Names": "Barisal", "Rainfall": 15230.0}],
            "floods": [{"Station_Names": "Barisal", "Flood?": 42}],
            "monthly_rainfall": [{"Month": 7, "Rainfall": 512.4}],
            "rainfall_flood_correlation": [{"Rainfall": 300.0, "Flood?": 0.5}]
        })))
        .mount(&mock_server)
        .await;

    let analysis = client_for(&mock_server).analysis().await.unwrap();
    assert!(!analysis.is_empty());
    assert_eq!(analysis.stations[0].rainfall, 15230.0);
    assert_eq!(analysis.floods[0].floods, 42.0);
    assert_eq!(analysis.monthly_rainfall[0].month, 7);
    assert_eq!(analysis.rainfall_flood_correlation[0].flood_rate, 0.5);
}

/// An `{error}` body with a 200 status is a failure, not an empty analysis
#[tokio::test]
async fn test_analysis_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "KeyError: 'Flood?'"})),
        )
        .mount(&mock_server)
        .await;

    match client_for(&mock_server).analysis().await {
        Err(AppError::Prediction(msg)) => assert!(msg.contains("Flood?")),
        other => panic!("Expected Prediction error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_analysis_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).analysis().await;
    assert!(matches!(result, Err(AppError::Json(_))));
}

#[tokio::test]
async fn test_station_series_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/series/Unknown"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "Station not found"})),
        )
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).station_series("Unknown").await;
    assert!(matches!(result, Err(AppError::Prediction(_))));
}

#[tokio::test]
async fn test_list_stations_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "data file missing"})),
        )
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).list_stations().await;
    assert!(matches!(result, Err(AppError::Prediction(_))));
}

/// Station names are escaped into the series path
#[tokio::test]
async fn test_station_series() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/series/Char%20Fasson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "station": "Char Fasson",
            "yearly": [{"year": 1950, "rainfall": 3520.0, "temperature": 26.1}],
            "monthly": [{"month": 7, "rainfall": 910.0, "temperature": null}]
        })))
        .mount(&mock_server)
        .await;

    let series = client_for(&mock_server)
        .station_series("Char Fasson")
        .await
        .unwrap();
    assert_eq!(series.station, "Char Fasson");
    assert_eq!(series.yearly[0].year, 1950);
    assert_eq!(series.monthly[0].temperature, None);
}

#[tokio::test]
async fn test_station_series_rejects_blank_name() {
    let mock_server = MockServer::start().await;
    let result = client_for(&mock_server).station_series("   ").await;
    assert!(matches!(result, Err(AppError::InvalidData(_))));
}

/// Alert delivery and rejection
#[tokio::test]
async fn test_send_alert() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alert"))
        .and(body_json(json!({"message": "River level rising at Barisal"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/alert"))
        .and(body_json(json!({"message": "quiet"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(
        client
            .send_alert("River level rising at Barisal")
            .await
            .unwrap(),
        AlertOutcome::Delivered
    );
    assert_eq!(
        client.send_alert("quiet").await.unwrap(),
        AlertOutcome::Rejected("queued".to_string())
    );
}
