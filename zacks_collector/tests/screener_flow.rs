mod common;

use common::*;
use serde_json::json;
use shared::JobKind;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zacks_collector::{build, fetcher, run_job, FilterSpec, ScrapeError, Session, SessionState};

const EXPORT_CSV: &str = "Company Name,Ticker,Zacks Rank,Value Score\nApple Inc.,AAPL,3,C\n\"Alphabet, Inc.\",GOOGL,2,B\n";

async fn mount_screener(site: &MockServer, api: &MockServer, reset_status: u16) {
    mount_login(site).await;

    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(api, "KEY123")))
        .mount(site)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("c_key", "KEY123"))
        .and(query_param("scr_type", "stock"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>screener</html>"))
        .mount(api)
        .await;

    Mock::given(method("GET"))
        .and(path("/reset_param.php"))
        .and(query_param("mode", "new"))
        .respond_with(ResponseTemplate::new(reset_status))
        .mount(api)
        .await;

    Mock::given(method("POST"))
        .and(path("/getrunscreendata.php"))
        .and(header(
            "content-type",
            "multipart/form-data; boundary=----WebKitFormBoundarynYAVaZAwVXgNHDGd",
        ))
        .and(body_string_contains("p_items[]"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(api)
        .await;

    Mock::given(method("GET"))
        .and(path("/export.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EXPORT_CSV))
        .mount(api)
        .await;
}

#[tokio::test]
async fn test_screener_job_end_to_end() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    // reset fails; the flow carries on
    mount_screener(&site, &api, 500).await;

    let out = tempfile::tempdir().unwrap();
    let config = config(&site, &api, 1);
    let job = job(
        JobKind::StockScreener,
        out.path(),
        json!([
            {"id": "zacks_rank", "value": "3", "operator": ">="},
            {"id": "value_score", "value": "B", "operator": "<="}
        ]),
    );

    let report = run_job(&config, &job).await.unwrap();
    assert_eq!(report.kind, JobKind::StockScreener);
    assert_eq!(report.rows, 2, "header line is not counted");
    assert_eq!(report.files.len(), 1);
    assert!(report.files[0].extension().is_some_and(|e| e == "csv"));
    assert_eq!(std::fs::read_to_string(&report.files[0]).unwrap(), EXPORT_CSV);

    let requests = api.received_requests().await.unwrap();
    let submit = requests
        .iter()
        .find(|r| r.url.path() == "/getrunscreendata.php")
        .unwrap();

    let cookies = submit.headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookies.contains(SESSION_COOKIE), "login cookie forwarded: {cookies}");
    assert!(cookies.contains("CURRENT_POST=edit_criteria"));

    let referer = submit.headers.get("referer").unwrap().to_str().unwrap();
    assert!(referer.contains("c_key=KEY123"));

    let body = String::from_utf8_lossy(&submit.body);
    let ops: Vec<usize> = ["name=\"operator[]\"\r\n\r\n6\r\n", "name=\"operator[]\"\r\n\r\n13\r\n"]
        .iter()
        .map(|needle| body.find(needle).unwrap())
        .collect();
    assert!(ops[0] < ops[1], "filters keep their input order");
    assert!(body.find("name=\"sort_type\"").unwrap() < ops[0], "boilerplate comes first");
    assert!(body.contains("name=\"p_items[]\"\r\n\r\n15005\r\n"));
    assert!(body.contains("name=\"p_item_name[]\"\r\n\r\nValue Score\r\n"));
    assert!(body.ends_with("------WebKitFormBoundarynYAVaZAwVXgNHDGd--\r\n"));

    let export = requests.iter().find(|r| r.url.path() == "/export.php").unwrap();
    let cookies = export.headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookies.contains(SESSION_COOKIE), "login cookie forwarded: {cookies}");
    assert!(cookies.contains("CURRENT_POST=edit_criteria"));
}

#[tokio::test]
async fn test_invalid_filter_never_submits() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    mount_login(&site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(&api, "KEY123")))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/getrunscreendata.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&api)
        .await;

    let out = tempfile::tempdir().unwrap();
    let job = job(
        JobKind::StockScreener,
        out.path(),
        json!([{"id": "zacks_rank", "value": "9", "operator": ">="}]),
    );
    let err = run_job(&config(&site, &api, 1), &job).await.unwrap_err();
    assert!(format!("{err:#}").contains("outside 1..=5"), "{err:#}");
}

#[tokio::test]
async fn test_login_failure_is_retried_with_fresh_sessions() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&site)
        .await;

    let out = tempfile::tempdir().unwrap();
    let job = job(JobKind::EarningsRelease, out.path(), json!([]));
    let err = run_job(&config(&site, &api, 2), &job).await.unwrap_err();
    assert!(format!("{err:#}").contains("login failed with status 403"), "{err:#}");
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_session_state_machine() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    mount_login(&site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(&api, "K-1")))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("c_key", "K-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&api)
        .await;

    let config = config(&site, &api, 1);
    let mut session = Session::new(&config.endpoints, std::time::Duration::from_secs(5)).unwrap();

    assert!(matches!(
        session.bind_context().await,
        Err(ScrapeError::InvalidState { actual: SessionState::Unauthenticated, .. })
    ));

    session.login(&config.username, &config.password).await.unwrap();
    assert_eq!(session.state(), SessionState::LoggedIn);

    let key = session.bind_context().await.unwrap();
    assert_eq!(key, "K-1");
    assert_eq!(session.state(), SessionState::ContextBound);

    session.establish_api_session(&key).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.context_key(), Some("K-1"));

    let requests = api.received_requests().await.unwrap();
    let init = requests.iter().find(|r| r.url.path() == "/").unwrap();
    let cookies = init.headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookies.contains(SESSION_COOKIE));
}

#[tokio::test]
async fn test_context_page_failures() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    mount_login(&site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>please log in</html>"))
        .up_to_n_times(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let config = config(&site, &api, 1);
    let mut session = Session::new(&config.endpoints, std::time::Duration::from_secs(5)).unwrap();
    session.login(&config.username, &config.password).await.unwrap();

    assert!(matches!(session.bind_context().await, Err(ScrapeError::ContextKeyNotFound)));
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert!(matches!(session.bind_context().await, Err(ScrapeError::ContextPageFailed(404))));
}

#[tokio::test]
async fn test_api_session_failure_status() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    mount_login(&site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(&api, "K")))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&api)
        .await;

    let config = config(&site, &api, 1);
    let mut session = Session::new(&config.endpoints, std::time::Duration::from_secs(5)).unwrap();
    session.login(&config.username, &config.password).await.unwrap();
    let key = session.bind_context().await.unwrap();

    let err = session.establish_api_session(&key).await.unwrap_err();
    assert!(matches!(err, ScrapeError::SessionInitFailed(503)));
    assert_eq!(err.status(), Some(503));
    assert_eq!(session.state(), SessionState::ContextBound);
}

/// Logs in and brings a session to `Ready` against the given servers.
async fn ready_session(site: &MockServer, api: &MockServer) -> Session {
    mount_login(site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(api, "KEY123")))
        .mount(site)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("c_key", "KEY123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(api)
        .await;

    let config = config(site, api, 1);
    let mut session = Session::new(&config.endpoints, std::time::Duration::from_secs(5)).unwrap();
    session.login(&config.username, &config.password).await.unwrap();
    let key = session.bind_context().await.unwrap();
    session.establish_api_session(&key).await.unwrap();
    session
}

#[tokio::test]
async fn test_submit_failure_carries_status() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    let session = ready_session(&site, &api).await;
    Mock::given(method("POST"))
        .and(path("/getrunscreendata.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;

    let query = build(&[FilterSpec::new("zacks_rank", "1", "=")]).unwrap();
    let err = fetcher::submit_query(&session, &query).await.unwrap_err();
    assert!(matches!(err, ScrapeError::QuerySubmitFailed(500)), "{err}");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_export_failure_carries_status() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    let session = ready_session(&site, &api).await;
    Mock::given(method("GET"))
        .and(path("/export.php"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&api)
        .await;

    let err = fetcher::download_results(&session).await.unwrap_err();
    assert!(matches!(err, ScrapeError::DownloadFailed(502)), "{err}");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_screener_job_fails_on_submit_status() {
    let site = MockServer::start().await;
    let api = MockServer::start().await;
    mount_login(&site).await;
    Mock::given(method("GET"))
        .and(path("/screening/stock-screener"))
        .respond_with(ResponseTemplate::new(200).set_body_string(screener_page(&api, "KEY123")))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/getrunscreendata.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/export.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&api)
        .await;

    let out = tempfile::tempdir().unwrap();
    let job = job(
        JobKind::StockScreener,
        out.path(),
        json!([{"id": "optionable", "value": "YES", "operator": "EQUAL"}]),
    );
    let err = run_job(&config(&site, &api, 1), &job).await.unwrap_err();
    assert!(format!("{err:#}").contains("screener query submit failed with status 500"), "{err:#}");
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}
