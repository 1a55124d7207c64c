#![allow(dead_code)]

use serde_json::Value;
use shared::{Config, Endpoints, JobKind, ParamBlock, ScrapeJob};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_COOKIE: &str = "ZACKS_SESSION=sess42";

pub fn blocks(v: Value) -> Vec<ParamBlock> {
    v.as_array()
        .expect("array of blocks")
        .iter()
        .map(|b| b.as_object().expect("block object").clone())
        .collect()
}

pub fn job(kind: JobKind, out_dir: &Path, params: Value) -> ScrapeJob {
    ScrapeJob {
        job_type: kind,
        out_dir: out_dir.to_path_buf(),
        parameters: blocks(params),
    }
}

/// The site is addressed by name and the API by IP, so the cookie jar treats
/// them as different hosts even though both servers listen on loopback.
pub fn site_uri(site: &MockServer) -> String {
    site.uri().replace("127.0.0.1", "localhost")
}

pub fn config(site: &MockServer, api: &MockServer, max_retries: u32) -> Config {
    Config {
        username: "someone@example.com".into(),
        password: "hunter2".into(),
        max_retries,
        delay_between_retries: 0,
        request_timeout_secs: 5,
        endpoints: Endpoints {
            site: site_uri(site),
            screener_api: api.uri(),
        },
        jobs: Vec::new(),
    }
}

pub async fn mount_login(site: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("force_login", "true"))
        .and(query_param("username", "someone@example.com"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", format!("{SESSION_COOKIE}; Path=/").as_str()),
        )
        .mount(site)
        .await;
}

pub fn screener_page(api: &MockServer, key: &str) -> String {
    format!(
        r#"<html><body><iframe style="" title="Stock Screener " id="screenerContent" src="{}/?scr_type=stock&c_id=zacks&c_key={key}&ref=screening" scrolling="yes" allowfullscreen></iframe></body></html>"#,
        api.uri()
    )
}

pub fn symbol(sym: &str) -> String {
    format!(r#"<span class="hoverquote-container-od"><span class="hoverquote-symbol">{sym}<span class="sr-only"></span></span></span>"#)
}

pub fn company(name: &str) -> String {
    format!(r#"<span title="{name}" >{name}</span>"#)
}

pub fn div(text: &str) -> String {
    format!(r#"<div class="right pos positive">{text}</div>"#)
}
