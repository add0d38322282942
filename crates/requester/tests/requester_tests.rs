//! End-to-end requester tests against a local mock server

use requester::{
    HttpMethod, JoinPolicy, LogTarget, Requester, RequesterConfig, RequesterError,
    RequesterErrorCategory, ResponseBody,
};
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn lines_with(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(level))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn requester_for(base_url: &str) -> (Requester, SharedBuf) {
    let buf = SharedBuf::default();
    let requester = Requester::new(
        RequesterConfig::new()
            .base_url(base_url)
            .log(LogTarget::sink(buf.clone())),
    )
    .unwrap();
    (requester, buf)
}

// ============================================================================
// Status logging and decoding
// ============================================================================

#[tokio::test]
async fn test_get_json_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&format!("{}/", server.uri()));
    let response = requester.get("widgets/42").await.unwrap();

    let expected_url = format!("{}/widgets/42", server.uri());
    assert_eq!(response.status_code, 200);
    assert_eq!(response.url, expected_url);
    assert_eq!(response.body, ResponseBody::Json(json!({"id": 42})));

    let info = log.lines_with("INFO");
    assert_eq!(info.len(), 1);
    assert!(info[0].contains(&format!("200 {}", expected_url)));
    assert!(log.lines_with("WARN").is_empty());
}

#[tokio::test]
async fn test_not_found_json_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let (status, body) = requester.get("widgets/42").await.unwrap().into_parts();

    assert_eq!(status, 404);
    assert_eq!(body, ResponseBody::Json(json!({"error": "not found"})));

    let warn = log.lines_with("WARN");
    assert_eq!(warn.len(), 1);
    assert!(warn[0].contains(&format!("404 {}/widgets/42", server.uri())));
    assert!(log.lines_with("INFO").is_empty());
}

#[tokio::test]
async fn test_non_200_success_logs_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/widgets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let response = requester.post("widgets", &json!({"name": "bolt"})).await.unwrap();

    assert!(response.is_success());
    assert_eq!(log.lines_with("WARN").len(), 1);
    assert!(log.lines_with("INFO").is_empty());
}

#[tokio::test]
async fn test_text_body_returned_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let (requester, _log) = requester_for(&server.uri());
    let response = requester.get("health").await.unwrap();

    assert_eq!(response.body, ResponseBody::Text("ok".to_string()));
}

#[tokio::test]
async fn test_malformed_json_falls_back_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"{not json".to_vec(), "application/json"))
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let response = requester.get("broken").await.unwrap();

    assert_eq!(response.body, ResponseBody::Text("{not json".to_string()));
    assert_eq!(log.lines_with("INFO").len(), 1);
    assert_eq!(log.lines_with("DEBUG").len(), 1);
    assert!(log.lines_with("ERROR").is_empty());
}

#[tokio::test]
async fn test_empty_json_body_decodes_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::<u8>::new(), "application/json"))
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let response = requester.get("empty").await.unwrap();

    assert_eq!(response.body, ResponseBody::Json(serde_json::Value::Null));
    assert!(log.lines_with("DEBUG").is_empty());
}

// ============================================================================
// Verbs, bodies and headers
// ============================================================================

#[tokio::test]
async fn test_verbs_and_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/widgets"))
        .and(body_json(json!({"name": "bolt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/widgets/1"))
        .and(body_json(json!({"name": "nut"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/widgets/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(body_json(json!({"q": "bolt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());

    let created = requester.post("widgets", &json!({"name": "bolt"})).await.unwrap();
    assert_eq!(created.body, ResponseBody::Json(json!({"created": true})));

    let updated = requester.put("widgets/1", &json!({"name": "nut"})).await.unwrap();
    assert_eq!(updated.body, ResponseBody::Json(json!({"updated": true})));

    let deleted = requester.delete("widgets/1").await.unwrap();
    assert_eq!(deleted.status_code, 204);
    assert_eq!(deleted.body, ResponseBody::Text(String::new()));

    let found = requester
        .request(HttpMethod::Get, "search")
        .json(&json!({"q": "bolt"}))
        .send()
        .await
        .unwrap();
    assert_eq!(found.body, ResponseBody::Json(json!([])));

    assert_eq!(log.lines_with("INFO").len(), 3);
    assert_eq!(log.lines_with("WARN").len(), 1);
}

#[tokio::test]
async fn test_per_call_headers_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .and(header("x-env", "override"))
        .and(header("x-keep", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let requester = Requester::new(
        RequesterConfig::new()
            .base_url(server.uri())
            .header("X-Env", "default")
            .header("X-Keep", "yes"),
    )
    .unwrap();

    let response = requester
        .request(HttpMethod::Get, "config")
        .header("x-env", "override")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_default_headers_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let requester = Requester::new(
        RequesterConfig::new()
            .base_url(server.uri())
            .header("Authorization", "Bearer t0k"),
    )
    .unwrap();

    assert_eq!(requester.get("me").await.unwrap().status_code, 200);
}

// ============================================================================
// URL joining
// ============================================================================

#[tokio::test]
async fn test_absolute_path_endpoint_overrides_base_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .expect(1)
        .mount(&server)
        .await;

    let (requester, _log) = requester_for(&format!("{}/api/v1", server.uri()));
    assert_eq!(
        requester.resolve("users").unwrap().as_str(),
        format!("{}/api/v1/users", server.uri())
    );

    let response = requester.get("/status").await.unwrap();
    assert_eq!(response.url, format!("{}/status", server.uri()));
}

#[tokio::test]
async fn test_concat_join_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let requester = Requester::new(
        RequesterConfig::new()
            .base_url(format!("{}/api", server.uri()))
            .join_policy(JoinPolicy::Concat),
    )
    .unwrap();

    assert_eq!(requester.get("users").await.unwrap().status_code, 200);
}

#[tokio::test]
async fn test_unresolvable_endpoint_is_logged_and_returned() {
    let buf = SharedBuf::default();
    let requester =
        Requester::new(RequesterConfig::new().log(LogTarget::sink(buf.clone()))).unwrap();

    let result = requester.get("relative/path").await;
    assert!(matches!(result, Err(RequesterError::InvalidUrl(_))));
    assert_eq!(buf.lines_with("ERROR").len(), 1);
}

// ============================================================================
// Dispatch failures and lifecycle
// ============================================================================

#[tokio::test]
async fn test_unreachable_host_propagates_after_logging() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let (requester, log) = requester_for(&format!("http://127.0.0.1:{}/", port));
    let err = requester.get("widgets").await.unwrap_err();

    assert!(matches!(err, RequesterError::Reqwest(_)));
    assert_eq!(err.category(), RequesterErrorCategory::Connection);

    let errors = log.lines_with("ERROR");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("GET widgets failed"));
    assert!(errors[0].contains("category=Connection"));
    assert!(log.lines_with("INFO").is_empty());
}

#[tokio::test]
async fn test_scoped_closes_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let handle = requester.clone();

    let status = requester
        .scoped(|r| async move { r.get("anything").await.map(|resp| resp.status_code) })
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert!(handle.is_closed());
    assert!(matches!(handle.get("anything").await, Err(RequesterError::Closed)));
    assert_eq!(log.contents().matches("session closed").count(), 1);
}

#[tokio::test]
async fn test_scoped_closes_on_error() {
    let (requester, _log) = requester_for("http://127.0.0.1:9/");
    let handle = requester.clone();

    let result: Result<(), RequesterError> = requester
        .scoped(|_r| async move { Err(RequesterError::InvalidUrl("boom".to_string())) })
        .await;

    assert!(result.is_err());
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_scoped_closes_when_cancelled() {
    let (requester, log) = requester_for("http://127.0.0.1:9/");
    let handle = requester.clone();

    let scope = requester.scoped(|_r| async move {
        std::future::pending::<()>().await;
        Ok::<(), RequesterError>(())
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(20), scope).await;

    assert!(timed_out.is_err());
    assert!(handle.is_closed());
    assert!(matches!(handle.get("anything").await, Err(RequesterError::Closed)));
    assert_eq!(log.contents().matches("session closed").count(), 1);
}

#[tokio::test]
async fn test_token_path_segment_kept_in_failure_log() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let (requester, log) = requester_for(&format!("http://127.0.0.1:{}/", port));
    assert!(requester.get("oauth/token/refresh").await.is_err());

    let errors = log.lines_with("ERROR");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(&format!("http://127.0.0.1:{}/oauth/token/refresh)", port)));
    assert!(!errors[0].contains("[REDACTED]"));
}

#[tokio::test]
async fn test_concurrent_calls_share_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(10)
        .mount(&server)
        .await;

    let (requester, log) = requester_for(&server.uri());
    let calls = (0..10).map(|_| {
        let requester = requester.clone();
        async move { requester.get("items").await }
    });

    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| matches!(r, Ok(resp) if resp.status_code == 200)));
    assert_eq!(log.lines_with("INFO").len(), 10);
}

#[tokio::test]
async fn test_disabled_logging_still_serves_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let requester = Requester::new(
        RequesterConfig::new()
            .base_url(server.uri())
            .log(LogTarget::named("/nonexistent-dir/requester.log")),
    )
    .unwrap();

    assert!(!requester.logger().is_enabled());
    assert_eq!(requester.get("x").await.unwrap().status_code, 200);
}
