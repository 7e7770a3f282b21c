//! End-to-end tests for the redirect gateway.
//!
//! Each test starts the full router on an ephemeral port. Landing pages,
//! affiliate trackers and the Telegram Bot API are played by `httptest`
//! servers, so no test touches the network. Mock servers listen on loopback,
//! which is why every config here sets `allow_private_targets`.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use httptest::{matchers::*, responders::*, Expectation, Server, ServerBuilder};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use affiliate_gateway::initialization::init_gateway;
use affiliate_gateway::{build_router, serve, AppState, Config, GatewayStats, StoreBackend};

const BOT_TOKEN: &str = "TESTTOKEN";
const CHAT_ID: &str = "42";
const SEND_MESSAGE_PATH: &str = "/botTESTTOKEN/sendMessage";

struct RunningGateway {
    base: String,
    client: Client,
    shutdown: CancellationToken,
}

impl RunningGateway {
    async fn start(config: Config) -> Self {
        let stats = Arc::new(GatewayStats::new());
        let gateway = init_gateway(&config, Arc::clone(&stats)).expect("gateway should build");
        let state = AppState {
            gateway: Arc::new(gateway),
            stats,
            env_label: config.env_label.clone(),
        };
        let router = build_router(state, config.enable_diag);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = CancellationToken::new();
        tokio::spawn(serve(listener, router, shutdown.clone()));

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base,
            client,
            shutdown,
        }
    }

    async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path_and_query))
            .send()
            .await
            .expect("gateway should answer")
    }

    async fn status(&self) -> Value {
        self.get("/status").await.json().await.unwrap()
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Gateway with alerts wired to `telegram` and chain inspection off.
fn config_with_alerts(telegram: &Server) -> Config {
    Config {
        store: StoreBackend::Memory,
        telegram_bot_token: Some(BOT_TOKEN.to_string()),
        telegram_chat_id: Some(CHAT_ID.to_string()),
        telegram_api_base: format!("http://{}", telegram.addr()),
        skip_chain_inspection: true,
        allow_private_targets: true,
        env_label: "test".to_string(),
        ..Default::default()
    }
}

fn affiliate_link(landing: &str) -> String {
    format!(
        "https://admitad.com/go?ulp={}",
        urlencoding::encode(landing)
    )
}

fn go_query(affiliate: &str) -> String {
    format!("/go?to={}", urlencoding::encode(affiliate))
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn live_landing_page_is_forwarded_unchanged() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(200)),
    );
    shop.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/item"),
            request::headers(contains(key("accept-language"))),
        ])
        .respond_with(status_code(200).body("<html>in stock</html>")),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();

    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let affiliate = affiliate_link(&shop.url_str("/item"));
    let response = gateway.get(&go_query(&affiliate)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), affiliate);
    assert_eq!(header(&response, "cache-control"), "no-store");
    assert_eq!(header(&response, "referrer-policy"), "no-referrer");
    assert_eq!(header(&response, "x-robots-tag"), "noindex, nofollow");
}

#[tokio::test]
async fn dead_landing_page_is_diverted_and_alerted_once() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(404)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(all_of![
            request::method_path("POST", SEND_MESSAGE_PATH),
            request::headers(contains(("content-type", "application/json"))),
        ])
        .times(1)
        .respond_with(json_encoded(json!({"ok": true, "result": {}}))),
    );

    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let response = gateway
        .get(&go_query(&affiliate_link(&shop.url_str("/item"))))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/out-of-stock?shop=127.0.0.1");
    assert_eq!(
        header(&response, "cache-control"),
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    assert_eq!(header(&response, "pragma"), "no-cache");
    assert_eq!(header(&response, "expires"), "0");

    let status = gateway.status().await;
    assert_eq!(status["requests"]["diverted_dead_link"], 1);
    assert_eq!(status["alerts"]["sent"], 1);
}

#[tokio::test]
async fn gone_landing_page_found_by_get_is_diverted() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(405)),
    );
    shop.expect(
        Expectation::matching(request::method_path("GET", "/item")).respond_with(status_code(410)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(request::method_path("POST", SEND_MESSAGE_PATH))
            .respond_with(json_encoded(json!({"ok": true}))),
    );

    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let response = gateway
        .get(&go_query(&affiliate_link(&shop.url_str("/item"))))
        .await;

    assert_eq!(location(&response), "/out-of-stock?shop=127.0.0.1");
}

#[tokio::test]
async fn host_outside_allow_list_is_rejected() {
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let response = gateway.get(&go_query("https://not-allowed.example/x")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header(&response, "content-type").starts_with("text/plain"));
    assert_eq!(response.text().await.unwrap(), "Bad request: domain not allowed");
}

#[tokio::test]
async fn malformed_destinations_are_rejected() {
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let response = gateway.get("/go").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Bad request: invalid URL");

    let response = gateway.get(&go_query("ftp://admitad.com/file")).await;
    assert_eq!(
        response.text().await.unwrap(),
        "Bad request: protocol must be http/https"
    );

    let response = gateway.get("/go?t=%21%21%21").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(gateway.status().await["requests"]["rejected"], 3);
}

#[tokio::test]
async fn repeated_dead_link_alerts_stop_at_the_ceiling() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item"))
            .times(3)
            .respond_with(status_code(404)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(request::method_path("POST", SEND_MESSAGE_PATH))
            .times(2)
            .respond_with(json_encoded(json!({"ok": true}))),
    );

    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let query = go_query(&affiliate_link(&shop.url_str("/item")));
    for _ in 0..3 {
        let response = gateway.get(&query).await;
        assert_eq!(location(&response), "/out-of-stock?shop=127.0.0.1");
    }

    let status = gateway.status().await;
    assert_eq!(status["alerts"]["sent"], 2);
    assert_eq!(status["alerts"]["throttled"], 1);
}

#[tokio::test]
async fn plain_and_base64_destinations_are_equivalent() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item"))
            .times(2)
            .respond_with(status_code(200)),
    );
    shop.expect(
        Expectation::matching(request::method_path("GET", "/item"))
            .times(2)
            .respond_with(status_code(200)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let affiliate = affiliate_link(&shop.url_str("/item"));
    let plain = gateway.get(&go_query(&affiliate)).await;
    let encoded = gateway
        .get(&format!(
            "/api/go?t={}",
            URL_SAFE_NO_PAD.encode(affiliate.as_bytes())
        ))
        .await;

    assert_eq!(plain.status(), encoded.status());
    assert_eq!(location(&plain), affiliate);
    assert_eq!(location(&encoded), affiliate);
}

#[tokio::test]
async fn unreachable_landing_page_fails_open() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let landing = format!("http://{}/item", closed.local_addr().unwrap());
    drop(closed);

    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let affiliate = affiliate_link(&landing);
    let response = gateway.get(&go_query(&affiliate)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), affiliate);
    assert_eq!(gateway.status().await["probe_indeterminate"], 1);
}

#[tokio::test]
async fn slow_landing_page_fails_open() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item"))
            .respond_with(delay_and_then(Duration::from_millis(400), status_code(404))),
    );
    shop.expect(
        Expectation::matching(request::method_path("GET", "/item"))
            .respond_with(delay_and_then(Duration::from_millis(400), status_code(404))),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let config = Config {
        head_timeout_ms: 100,
        get_timeout_ms: 100,
        ..config_with_alerts(&telegram)
    };
    let gateway = RunningGateway::start(config).await;

    let affiliate = affiliate_link(&shop.url_str("/item"));
    let response = gateway.get(&go_query(&affiliate)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), affiliate);
    let status = gateway.status().await;
    assert_eq!(status["probe_indeterminate"], 1);
    assert_eq!(status["alerts"]["sent"], 0);
}

#[tokio::test]
async fn server_errors_from_landing_page_fail_open() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(500)),
    );
    shop.expect(
        Expectation::matching(request::method_path("GET", "/item")).respond_with(status_code(503)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let affiliate = affiliate_link(&shop.url_str("/item"));
    let response = gateway.get(&go_query(&affiliate)).await;

    assert_eq!(location(&response), affiliate);
}

#[tokio::test]
async fn dead_link_without_alert_credentials_still_diverts() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(404)),
    );
    let config = Config {
        store: StoreBackend::Memory,
        skip_chain_inspection: true,
        allow_private_targets: true,
        ..Default::default()
    };
    let gateway = RunningGateway::start(config).await;

    let response = gateway
        .get(&go_query(&affiliate_link(&shop.url_str("/item"))))
        .await;

    assert_eq!(location(&response), "/out-of-stock?shop=127.0.0.1");
    assert_eq!(gateway.status().await["alerts"]["sent"], 0);
}

#[tokio::test]
async fn failing_alert_delivery_does_not_change_the_redirect() {
    let shop = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    shop.expect(
        Expectation::matching(request::method_path("HEAD", "/item")).respond_with(status_code(404)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(request::method_path("POST", SEND_MESSAGE_PATH))
            .respond_with(status_code(500)),
    );

    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;
    let response = gateway
        .get(&go_query(&affiliate_link(&shop.url_str("/item"))))
        .await;

    assert_eq!(location(&response), "/out-of-stock?shop=127.0.0.1");
    assert_eq!(gateway.status().await["alerts"]["delivery_failed"], 1);
}

#[tokio::test]
async fn problematic_click_through_is_diverted_without_probing() {
    let tracker = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let offerwall = tracker.url_str("/offerwall/landing");
    tracker.expect(
        Expectation::matching(request::method_path("HEAD", "/aff"))
            .respond_with(status_code(302).append_header("Location", offerwall.clone())),
    );
    tracker.expect(
        Expectation::matching(request::method_path("HEAD", "/offerwall/landing"))
            .respond_with(status_code(200)),
    );
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(request::method_path("POST", SEND_MESSAGE_PATH))
            .times(1)
            .respond_with(json_encoded(json!({"ok": true}))),
    );

    let config = Config {
        allowed_hosts: vec!["127.0.0.1".to_string()],
        problematic_patterns: vec!["/offerwall/".to_string()],
        skip_chain_inspection: false,
        ..config_with_alerts(&telegram)
    };
    let gateway = RunningGateway::start(config).await;

    let affiliate = format!(
        "{}?ulp={}",
        tracker.url_str("/aff"),
        urlencoding::encode("https://shop.example/item")
    );
    let response = gateway.get(&go_query(&affiliate)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/out-of-stock?shop=shop.example");
    assert_eq!(
        gateway.status().await["requests"]["diverted_problematic_redirect"],
        1
    );
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let health = gateway.get("/health").await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    gateway.get("/go").await;
    let metrics = gateway.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("affiliate_gateway_outcomes_total{outcome=\"rejected\"} 1"));

    let status = gateway.status().await;
    assert_eq!(status["env"], "test");
    assert_eq!(status["total_requests"], 1);
}

#[tokio::test]
async fn diagnostic_endpoint_is_hidden_unless_enabled() {
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    let gateway = RunningGateway::start(config_with_alerts(&telegram)).await;

    let response = gateway.get("/api/diag-telegram").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn diagnostic_endpoint_sends_escaped_text() {
    let telegram = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
    telegram.expect(
        Expectation::matching(all_of![
            request::method_path("POST", SEND_MESSAGE_PATH),
            request::body(json_decoded(eq(json!({
                "chat_id": CHAT_ID,
                "text": "&lt;b&gt;hi&lt;/b&gt;",
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            })))),
        ])
        .respond_with(json_encoded(json!({"ok": true, "result": {"message_id": 7}}))),
    );

    let config = Config {
        enable_diag: true,
        ..config_with_alerts(&telegram)
    };
    let gateway = RunningGateway::start(config).await;

    let response = gateway.get("/api/diag-telegram?text=%3Cb%3Ehi%3C%2Fb%3E").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, "content-type").starts_with("application/json"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["request"]["chatId"], CHAT_ID);
    assert_eq!(body["request"]["text"], "<b>hi</b>");
    assert_eq!(body["response"]["status"], 200);
    assert!(body["response"]["body"]
        .as_str()
        .unwrap()
        .contains("\"message_id\":7"));
}

#[tokio::test]
async fn diagnostic_endpoint_without_credentials() {
    let config = Config {
        enable_diag: true,
        store: StoreBackend::Memory,
        ..Default::default()
    };
    let gateway = RunningGateway::start(config).await;

    let response = gateway.get("/api/diag-telegram").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"ok": false, "error": "Missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID"})
    );
}
