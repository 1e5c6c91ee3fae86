use brochure_common::BrochureError;
use brochure_web::{HttpPageFetcher, PageFetcher, NO_TITLE};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UA: &str = "Mozilla/5.0 (brochure-test)";

const LANDING: &str = r#"<html>
<head><title>Acme Rockets</title></head>
<body>
  <nav><a href="/about">About</a> <a href="/careers">Careers</a> <a href="mailto:hi@acme.test">Mail</a></nav>
  <h1>Acme Rockets</h1>
  <script>analytics()</script>
  <p>Reusable launch vehicles.</p>
</body>
</html>"#;

fn fetcher() -> HttpPageFetcher {
    HttpPageFetcher::new(Duration::from_secs(2), UA).expect("fetcher builds")
}

#[tokio::test]
async fn fetch_page_downloads_once_and_extracts_both_views() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", UA))
        .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch_page(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(page.contents.title, "Acme Rockets");
    assert_eq!(
        page.contents.body_text,
        "About\nCareers\nMail\nAcme Rockets\nReusable launch vehicles."
    );
    assert_eq!(page.links, vec!["/about", "/careers", "mailto:hi@acme.test"]);
}

#[tokio::test]
async fn fetch_contents_renders_placeholder_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>just text</p>"))
        .mount(&server)
        .await;

    let contents = fetcher()
        .fetch_contents(&format!("{}/plain", server.uri()))
        .await
        .unwrap();

    assert_eq!(contents.title, NO_TITLE);
    assert_eq!(contents.into_text(), "No title found\n\njust text");
}

#[tokio::test]
async fn latin1_page_is_decoded_with_declared_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zurich"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=iso-8859-1")
                .set_body_bytes(b"<title>Caf\xE9</title><body><p>Z\xFCrich</p></body>".to_vec()),
        )
        .mount(&server)
        .await;

    let contents = fetcher()
        .fetch_contents(&format!("{}/zurich", server.uri()))
        .await
        .unwrap();

    assert_eq!(contents.title, "Café");
    assert_eq!(contents.body_text, "Zürich");
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let err = fetcher().fetch_links(&url).await.unwrap_err();

    match err {
        BrochureError::Fetch { url: failed, .. } => assert_eq!(failed, url),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn slow_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LANDING)
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let fast = HttpPageFetcher::new(Duration::from_millis(100), UA).unwrap();
    let err = fast.fetch_html(&server.uri()).await.unwrap_err();
    assert!(matches!(err, BrochureError::Fetch { .. }));
}

#[tokio::test]
async fn relative_url_is_rejected_as_fetch_error() {
    let err = fetcher().fetch_html("/about").await.unwrap_err();
    assert!(err.to_string().starts_with("Failed to fetch /about"));
}

#[test]
fn invalid_user_agent_is_a_config_error() {
    let err = match HttpPageFetcher::new(Duration::from_secs(1), "bad\nagent") {
        Ok(_) => panic!("newline must be rejected"),
        Err(e) => e,
    };
    assert!(matches!(err, BrochureError::Config(_)));
}
