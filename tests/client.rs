use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use secrecy::Secret;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use purpleair_ingest::client::{PurpleAirClient, SensorSource};
use purpleair_ingest::configuration::{PurpleAirSettings, Settings, StorageBackend, StorageSettings};
use purpleair_ingest::error::FetchError;
use purpleair_ingest::ingestion::{handle_invocation, ingest, Outcome};

/// Answers a single HTTP request with `status` and `body`, then hands back
/// the raw request it received.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        loop {
            let read = socket.read(&mut buffer).await.unwrap();
            request.extend_from_slice(&buffer[..read]);
            if read == 0 || request.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(request).unwrap()
    });

    (format!("http://{}/v1", address), handle)
}

fn settings(base_url: String) -> PurpleAirSettings {
    PurpleAirSettings {
        sensor_index: 156275,
        base_url,
        api_key: Secret::new("test-key".to_string()),
        timeout_secs: 15,
    }
}

fn fresh_body() -> String {
    json!({
        "api_version": "V1.0.11-0.0.49",
        "sensor": {
            "sensor_index": 156275,
            "last_seen": Utc::now().timestamp() - 60,
            "rssi": -61,
            "humidity": 41,
            "temperature": 78.3,
            "pressure": 1012.44,
            "pm2.5": 3.1,
            "pm2.5_alt": 2.4,
            "visual_range": 12,
            "stats": { "pm2.5_6hour": 4.27 }
        }
    })
    .to_string()
}

#[tokio::test]
async fn sends_the_expected_request() {
    let (base_url, server) = serve_once("200 OK", fresh_body()).await;
    let client = PurpleAirClient::new(&settings(format!("{}/", base_url))).unwrap();
    assert_eq!(client.url(), format!("{}/sensors/156275/", base_url));

    let before = Utc::now();
    let fetched = client.fetch().await.unwrap();

    assert!(fetched.fetched_at >= before);
    assert_eq!(fetched.response.sensor.unwrap().sensor_index, 156275);

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("get /v1/sensors/156275/?fields=last_seen"));
    assert!(request.contains("pm2.5_alt"));
    assert!(request.contains("x-api-key: test-key"));
    assert!(request.contains("accept: application/json"));
}

#[tokio::test]
async fn error_status_is_reported() {
    let (base_url, server) = serve_once("403 Forbidden", r#"{"error":"InvalidApiKeyError"}"#.to_string()).await;
    let client = PurpleAirClient::new(&settings(base_url)).unwrap();

    let error = client.fetch().await.unwrap_err();

    match error {
        FetchError::Status { status, body } => {
            assert_eq!(status.as_u16(), 403);
            assert!(body.contains("InvalidApiKeyError"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let (base_url, server) = serve_once("200 OK", "not json".to_string()).await;
    let client = PurpleAirClient::new(&settings(base_url)).unwrap();

    let error = client.fetch().await.unwrap_err();

    assert!(matches!(error, FetchError::MalformedPayload(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let client = PurpleAirClient::new(&settings(format!("http://{}", address))).unwrap();

    let error = client.fetch().await.unwrap_err();

    assert!(matches!(error, FetchError::Transport(_)));
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });
    let mut settings = settings(format!("http://{}", address));
    settings.timeout_secs = 1;
    let client = PurpleAirClient::new(&settings).unwrap();

    let error = client.fetch().await.unwrap_err();
    assert!(matches!(&error, FetchError::Transport(e) if e.is_timeout()));

    let outcome = ingest(&client, || unreachable!("nothing to store")).await.unwrap();
    assert_eq!(outcome, Outcome::SkippedNoData);
    server.abort();
}

#[tokio::test]
async fn invocation_writes_parquet_to_local_storage() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, server) = serve_once("200 OK", fresh_body()).await;
    let settings = Settings {
        purpleair: settings(base_url),
        storage: StorageSettings {
            backend: StorageBackend::Local,
            bucket_name: Some("sensor-lake".to_string()),
            local_root: dir.path().to_path_buf(),
        },
    };

    let response = handle_invocation(&settings).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "Data ingestion and upload successful!");
    server.await.unwrap();

    let day = dir
        .path()
        .join("sensor-lake/data/purpleair")
        .join(Utc::now().format("%Y/%m/%d").to_string());
    let written: Vec<PathBuf> = std::fs::read_dir(day)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].to_string_lossy().ends_with("Z.parquet"));
}

#[tokio::test]
async fn invocation_without_bucket_fails_once_there_is_data() {
    let (base_url, server) = serve_once("200 OK", fresh_body()).await;
    let settings = Settings {
        purpleair: settings(base_url),
        storage: StorageSettings {
            backend: StorageBackend::S3,
            bucket_name: None,
            local_root: PathBuf::from("data-lake"),
        },
    };

    let response = handle_invocation(&settings).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("bucket name missing"));
    server.await.unwrap();
}
