use std::path::PathBuf;

use revenue_api::{create_router, AppState, Config, ModelManager, Validator};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn models_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models")
}

fn example() -> Value {
    json!({
        "PersonType": "Individual",
        "OrderQty": 1,
        "Name": "Mountain-100 Black, 42",
        "ProductLine": "Mountain",
        "Name_territory": "Northeast",
        "CountryRegionCode": "US",
        "Group": "North America",
        "OrderDate": "2013-01-01"
    })
}

fn store_contact_order() -> Value {
    json!({
        "PersonType": "Store Contact",
        "OrderQty": 10,
        "Name": "Road-150 Red, 62",
        "ProductLine": "Road",
        "Name_territory": "Canada",
        "CountryRegionCode": "CA",
        "Group": "North America",
        "OrderDate": "2013-08-15"
    })
}

async fn spawn(model: Option<ModelManager>) -> std::net::SocketAddr {
    let config = Config {
        max_batch_size: 5,
        ..Config::default()
    };
    let app = create_router(AppState::new(model, Validator::lenient(), config.max_batch_size), &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn spawn_loaded() -> std::net::SocketAddr {
    let model = ModelManager::load(&models_dir(), "xgboost_model").expect("load demo artifacts");
    spawn(Some(model)).await
}

async fn send_raw(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> (u16, Value) {
    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    let req = match body {
        Some(body) => format!(
            "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    };
    stream.write_all(req.as_bytes()).await.expect("write");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    let json = serde_json::from_str(body).unwrap_or(Value::Null);
    (status, json)
}

async fn get_head(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.expect("write");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
        .split("\r\n\r\n")
        .next()
        .unwrap_or_default()
        .to_string()
}

async fn post(addr: std::net::SocketAddr, path: &str, body: &Value) -> (u16, Value) {
    send_raw(addr, "POST", path, Some(&body.to_string())).await
}

#[tokio::test]
async fn predict_echoes_example_and_returns_finite_value() {
    let addr = spawn_loaded().await;
    let (status, body) = post(addr, "/predict", &example()).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["input_data"], example());
    assert_eq!(body["model_name"], "xgboost_model");
    assert!(body["timestamp"].is_string());
    let prediction = body["prediction"].as_f64().expect("number");
    assert!(prediction.is_finite() && prediction >= 0.0);
    assert_eq!(prediction, 1875.0);
}

#[tokio::test]
async fn negative_model_output_is_clamped() {
    let addr = spawn_loaded().await;
    let mut record = example();
    record["Name"] = json!("Prototype Frame");
    record["OrderDate"] = json!("2011-06-01");
    let (status, body) = post(addr, "/predict", &record).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["prediction"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn invalid_requests_are_client_errors() {
    let addr = spawn_loaded().await;

    let mut zero = example();
    zero["OrderQty"] = json!(0);
    let (status, body) = post(addr, "/predict", &zero).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["detail"], "OrderQty must be a positive integer");

    let mut missing = example();
    missing.as_object_mut().unwrap().remove("Name_territory");
    let (status, body) = post(addr, "/predict", &missing).await;
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "Name_territory is required");

    let (status, body) = send_raw(addr, "POST", "/predict", Some("{\"PersonType\":")).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_category_surfaces_inference_cause() {
    let addr = spawn_loaded().await;
    let mut record = example();
    record["PersonType"] = json!("Reseller");
    let (status, body) = post(addr, "/predict", &record).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "inference_error");
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("unknown category 'Reseller' for PersonType"));
}

#[tokio::test]
async fn batch_preserves_order_and_echoes_inputs() {
    let addr = spawn_loaded().await;
    let data = vec![example(), store_contact_order()];
    let (status, body) = post(addr, "/predict/batch", &json!({ "data": data })).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["total_records"], 2);

    let predictions = body["predictions"].as_array().expect("predictions");
    assert_eq!(predictions.len(), data.len());
    for (i, item) in predictions.iter().enumerate() {
        assert_eq!(item["index"], i);
        assert_eq!(item["input_data"], data[i]);
    }
    assert_eq!(predictions[0]["prediction"].as_f64(), Some(1875.0));
    assert_eq!(predictions[1]["prediction"].as_f64(), Some(2750.0));
}

#[tokio::test]
async fn batch_fails_whole_request_on_bad_row() {
    let addr = spawn_loaded().await;
    let mut bad = store_contact_order();
    bad["OrderDate"] = json!("15/08/2013");
    let (status, body) = post(addr, "/predict/batch", &json!({ "data": [example(), bad] })).await;
    assert_eq!(status, 400);
    assert_eq!(
        body["detail"],
        "data[1]: OrderDate must be a valid date in YYYY-MM-DD format"
    );

    let too_many: Vec<Value> = (0..6).map(|_| example()).collect();
    let (status, _) = post(addr, "/predict/batch", &json!({ "data": too_many })).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn health_and_root_report_loaded_model() {
    let addr = spawn_loaded().await;
    let (status, body) = send_raw(addr, "GET", "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_name"], "xgboost_model");

    let (status, body) = send_raw(addr, "GET", "/", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["endpoints"]["predict"], "/predict");
    assert_eq!(body["endpoints"]["batch_predict"], "/predict/batch");
}

#[tokio::test]
async fn degraded_server_stays_up_without_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(ModelManager::load(dir.path(), "xgboost_model").is_err());
    let addr = spawn(None).await;

    let (status, body) = send_raw(addr, "GET", "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["model_loaded"], false);
    assert!(body["model_name"].is_null());

    let (status, _) = send_raw(addr, "GET", "/", None).await;
    assert_eq!(status, 200);

    let (status, body) = post(addr, "/predict", &example()).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "model_unavailable");
}

#[tokio::test]
async fn degraded_server_still_reports_validation_errors_first() {
    let addr = spawn(None).await;

    let mut missing = example();
    missing.as_object_mut().unwrap().remove("OrderQty");
    let (status, body) = post(addr, "/predict", &missing).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["detail"], "OrderQty is required");

    let (status, body) = send_raw(addr, "POST", "/predict", Some("{\"PersonType\":")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = post(addr, "/predict/batch", &json!({ "data": [missing] })).await;
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "data[0]: OrderQty is required");
}

#[tokio::test]
async fn integral_float_quantity_is_normalized() {
    let addr = spawn_loaded().await;
    let mut record = example();
    record["OrderQty"] = json!(1.0);
    let (status, body) = post(addr, "/predict", &record).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["input_data"], example());
}

#[tokio::test]
async fn client_root_redirects_to_trailing_slash() {
    let addr = spawn_loaded().await;
    let head = get_head(addr, "/app").await;
    let status_line = head.lines().next().unwrap_or_default();
    assert!(status_line.contains(" 308 "), "{head}");
    assert!(
        head.lines()
            .any(|l| l.to_ascii_lowercase() == "location: /app/"),
        "{head}"
    );
}

#[tokio::test]
async fn validation_rules_are_published_in_check_order() {
    let addr = spawn_loaded().await;
    let (status, body) = send_raw(addr, "GET", "/validation-rules", None).await;
    assert_eq!(status, 200);
    let fields: Vec<&str> = body["rules"]
        .as_array()
        .expect("rules")
        .iter()
        .map(|r| r["field"].as_str().expect("field"))
        .collect();
    assert_eq!(
        fields,
        [
            "PersonType",
            "OrderQty",
            "Name",
            "ProductLine",
            "Name_territory",
            "CountryRegionCode",
            "Group",
            "OrderDate"
        ]
    );
    assert_eq!(body["rules"][1]["kind"], "positive_integer");
    assert_eq!(body["rules"][1]["max"], 1000);
    assert_eq!(body["max_batch_size"], 5);
    assert_eq!(body["strict_categories"], false);
}
