//! Result fetching
//! Query submission, CSV export download and the calendar / release / ESP data calls

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::{Result, ScrapeError};
use crate::query::{EncodedQuery, FORM_BOUNDARY};
use crate::session::{Session, SessionState};

/// Marks the criteria as edited so the export reflects the submitted query.
pub const EDIT_CRITERIA_COOKIE: (&str, &str) = ("CURRENT_POST", "edit_criteria");

pub const SUBMIT_PATH: &str = "/getrunscreendata.php";
pub const EXPORT_PATH: &str = "/export.php";
pub const CALENDAR_PATH: &str = "/includes/classes/z2_class_calendarfunctions_data.php";
pub const RELEASE_PATH: &str = "/research/earnings/earning_export.php";
pub const ESP_PATH: &str = "/esp/esp_buysell_data_handler.php";

pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/* ---- Screener ---- */

/// Posts the encoded query to the screener API as multipart form data.
pub async fn submit_query(session: &Session, query: &EncodedQuery) -> Result<()> {
    session.expect_state(SessionState::Ready)?;

    let url = session.api().join(SUBMIT_PATH)?;
    let body = query.to_multipart(FORM_BOUNDARY);
    debug!("submitting {} filter(s), {} byte body", query.fields().len(), body.len());

    let mut req = session
        .client()
        .post(url.clone())
        .header(ACCEPT, "*/*")
        .header(CONTENT_TYPE, multipart_content_type(FORM_BOUNDARY))
        .header("x-requested-with", "XMLHttpRequest")
        .header(ORIGIN, origin_of(session.api()))
        .header(REFERER, session.screener_referer())
        .body(body);
    if let Some(cookies) = session.cross_host_cookies(&url, &[EDIT_CRITERIA_COOKIE]) {
        req = req.header(COOKIE, cookies);
    }

    let res = req.send().await?;
    if res.status() != StatusCode::OK {
        return Err(ScrapeError::QuerySubmitFailed(res.status().as_u16()));
    }
    Ok(())
}

/// Raw bytes of the export for the last submitted query.
pub async fn download_raw(session: &Session) -> Result<Vec<u8>> {
    session.expect_state(SessionState::Ready)?;

    let url = session.api().join(EXPORT_PATH)?;
    let mut req = session
        .client()
        .get(url.clone())
        .header(REFERER, session.screener_referer())
        .header("upgrade-insecure-requests", "1");
    if let Some(cookies) = session.cross_host_cookies(&url, &[EDIT_CRITERIA_COOKIE]) {
        req = req.header(COOKIE, cookies);
    }

    let res = req.send().await?;
    if res.status() != StatusCode::OK {
        return Err(ScrapeError::DownloadFailed(res.status().as_u16()));
    }
    let bytes = res.bytes().await?;
    info!("📥 Downloaded {} bytes of screener results", bytes.len());
    Ok(bytes.to_vec())
}

/// Downloads the export and parses it as a headerless table.
pub async fn download_results(session: &Session) -> Result<Vec<Vec<String>>> {
    let body = download_raw(session).await?;
    parse_csv_table(&body)
}

/// Rows keep whatever width the remote produced.
pub fn parse_csv_table(body: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/* ---- Calendar / release / ESP ---- */

/// One calendar tab for the day containing `at`.
pub async fn fetch_calendar(session: &Session, at: DateTime<Utc>, type_code: u8) -> Result<Vec<u8>> {
    session.expect_logged_in()?;

    let mut url = session.site().join(CALENDAR_PATH)?;
    url.query_pairs_mut()
        .append_pair("calltype", "eventscal")
        .append_pair("date", &at.timestamp().to_string())
        .append_pair("type", &type_code.to_string())
        .append_pair("search_trigger", "0");

    get_bytes(session, url).await
}

/// Tab-separated earnings release export for the day containing `at`.
pub async fn fetch_release(session: &Session, at: DateTime<Utc>) -> Result<Vec<u8>> {
    session.expect_logged_in()?;

    let mut url = session.site().join(RELEASE_PATH)?;
    url.query_pairs_mut()
        .append_pair("timestamp", &at.timestamp().to_string())
        .append_pair("tab_id", "1");

    get_bytes(session, url).await
}

/// Posts an url-encoded ESP filter form.
pub async fn fetch_esp(session: &Session, form: String) -> Result<Vec<u8>> {
    session.expect_logged_in()?;

    let url = session.site().join(ESP_PATH)?;
    let mut req = session
        .client()
        .post(url.clone())
        .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
        .header("x-requested-with", "XMLHttpRequest")
        .body(form);
    if let Some(cookies) = session.cross_host_cookies(&url, &[EDIT_CRITERIA_COOKIE]) {
        req = req.header(COOKIE, cookies);
    }

    let res = req.send().await?;
    if res.status() != StatusCode::OK {
        return Err(ScrapeError::DownloadFailed(res.status().as_u16()));
    }
    Ok(res.bytes().await?.to_vec())
}

async fn get_bytes(session: &Session, url: url::Url) -> Result<Vec<u8>> {
    let res = session.client().get(url).send().await?;
    if res.status() != StatusCode::OK {
        return Err(ScrapeError::DownloadFailed(res.status().as_u16()));
    }
    Ok(res.bytes().await?.to_vec())
}

fn origin_of(url: &url::Url) -> HeaderValue {
    HeaderValue::from_str(&url.origin().ascii_serialization())
        .unwrap_or_else(|_| HeaderValue::from_static("null"))
}
