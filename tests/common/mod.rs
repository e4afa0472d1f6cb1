//! Common test utilities for sl-export integration tests
//!
//! Each test gets its own wiremock server standing in for the Service Layer,
//! with `POST /b1s/v1/Login` already mounted.

#![allow(dead_code)]

use serde_json::{Value, json};
use sl_export::{Config, HttpTransport, RequestExecutor};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Service Layer root path on the mock server
pub const ROOT: &str = "/b1s/v1";

/// Start a mock Service Layer that accepts any login
pub async fn start_service_layer() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{ROOT}/Login")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "B1SESSION=test-session; Path=/")
                .set_body_json(json!({"SessionId": "test-session"})),
        )
        .mount(&server)
        .await;
    server
}

/// Config pointing at `server`, with short retry delays and a small page size
pub fn test_config(server: &MockServer, page_size: u32) -> Config {
    let mut config = Config::new(format!("{}{ROOT}", server.uri()));
    config.service.company_db = "SBODEMO".to_string();
    config.service.username = "manager".to_string();
    config.service.password = "secret".to_string();
    config.service.request_timeout = Duration::from_secs(5);
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(50);
    config.pagination.page_size = page_size;
    config
}

/// Log in and build an executor for `config`
pub async fn connect(config: &Config) -> RequestExecutor {
    let transport = HttpTransport::connect(config)
        .await
        .expect("login against mock server");
    RequestExecutor::new(Arc::new(transport), config).expect("valid executor config")
}

/// Collection page body
pub fn page(records: Value, next_link: Option<&str>) -> ResponseTemplate {
    let mut body = json!({ "value": records });
    if let Some(link) = next_link {
        body["odata.nextLink"] = Value::String(link.to_string());
    }
    ResponseTemplate::new(200).set_body_json(body)
}

/// Full path of `resource` under the Service Layer root
pub fn sl_path(resource: &str) -> String {
    format!("{ROOT}/{resource}")
}
