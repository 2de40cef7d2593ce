// tests/notify_http.rs
use myfeeds::ingest::http::HttpFetcher;
use myfeeds::notify::{DiscordNotifier, Notifier, ServerChanNotifier, SlackNotifier};
use std::time::Duration;

use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn serverchan_posts_title_and_digest_as_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/SCU123.send"))
        .and(body_string_contains("text=%5B"))
        .and(body_string_contains("desp=hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errno":0,"errmsg":"success"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let n = ServerChanNotifier::with_base_url(&server.uri(), "SCU123", HttpFetcher::default());
    n.push("Bilibili", "hello").await.unwrap();
}

#[tokio::test]
async fn serverchan_errno_is_a_push_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errno":1024,"errmsg":"bad pushtoken"}"#))
        .mount(&server)
        .await;

    let n = ServerChanNotifier::with_base_url(&server.uri(), "nope", HttpFetcher::default());
    let err = n.push("微博", "x").await.unwrap_err();
    assert_eq!(err.kind(), "notify");
}

#[tokio::test]
async fn discord_retries_then_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let n = DiscordNotifier::new(format!("{}/hook", server.uri()), HttpFetcher::default()).with_retries(2);
    assert!(n.push("优酷", "digest").await.is_err());
}

#[tokio::test]
async fn slack_sends_labelled_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({"text": "*[Bilibili]*\ndigest"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let n = SlackNotifier::new(format!("{}/hook", server.uri()), HttpFetcher::default());
    n.push("Bilibili", "digest").await.unwrap();
}

#[tokio::test]
async fn webhooks_use_the_shared_http_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("user-agent", "myfeeds-test/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let http = HttpFetcher::new(Some(Duration::from_secs(5)), "myfeeds-test/1");
    DiscordNotifier::new(format!("{}/discord", server.uri()), http.clone())
        .push("微博", "digest")
        .await
        .unwrap();
    SlackNotifier::new(format!("{}/slack", server.uri()), http)
        .push("微博", "digest")
        .await
        .unwrap();
}

#[tokio::test]
async fn slow_webhook_hits_the_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let http = HttpFetcher::new(Some(Duration::from_millis(200)), "myfeeds-test/1");
    let err = SlackNotifier::new(format!("{}/hook", server.uri()), http)
        .push("Bilibili", "digest")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "notify");
}
