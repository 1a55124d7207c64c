//! Authenticated Zacks session
//! Login, context-key binding and screener API session setup over one cookie jar

use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::StatusCode;
use shared::Endpoints;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::normalize::strip_between;

pub const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/106.0.0.0 Safari/537.36";
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9";

pub const SCREENER_PAGE_PATH: &str = "/screening/stock-screener";
const IFRAME_LEFT: &str = r#"<iframe style="" title="Stock Screener " id="screenerContent" src=""#;
const IFRAME_RIGHT: &str = r#"" scrolling="yes" allowfullscreen></iframe>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    LoggedIn,
    ContextBound,
    Ready,
}

fn default_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    h.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    h
}

/// Cookie-backed browsing session. One per job attempt; never shared.
pub struct Session {
    client: reqwest::Client,
    jar: Arc<Jar>,
    site: Url,
    api: Url,
    state: SessionState,
    context_key: Option<String>,
}

impl Session {
    pub fn new(endpoints: &Endpoints, timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .default_headers(default_headers())
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            jar,
            site: Url::parse(&endpoints.site)?,
            api: Url::parse(&endpoints.screener_api)?,
            state: SessionState::Unauthenticated,
            context_key: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context_key(&self) -> Option<&str> {
        self.context_key.as_deref()
    }

    pub fn site(&self) -> &Url {
        &self.site
    }

    pub fn api(&self) -> &Url {
        &self.api
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(ScrapeError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    pub(crate) fn expect_logged_in(&self) -> Result<()> {
        if self.state == SessionState::Unauthenticated {
            return Err(ScrapeError::InvalidState {
                expected: SessionState::LoggedIn,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Sends credentials; only a 200 counts as success.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.expect_state(SessionState::Unauthenticated)?;
        info!("🔐 Logging in to {}", self.site.host_str().unwrap_or("site"));

        let mut url = self.site.clone();
        url.query_pairs_mut()
            .append_pair("force_login", "true")
            .append_pair("username", username)
            .append_pair("password", password)
            .append_pair("remember_me", "off");

        let res = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;

        if res.status() != StatusCode::OK {
            return Err(ScrapeError::AuthenticationFailed(res.status().as_u16()));
        }

        self.state = SessionState::LoggedIn;
        info!("✅ Logged in");
        Ok(())
    }

    /// Fetches the stock screener page and pulls the context key out of its iframe.
    pub async fn bind_context(&mut self) -> Result<String> {
        self.expect_state(SessionState::LoggedIn)?;

        let mut url = self.site.join(SCREENER_PAGE_PATH)?;
        url.query_pairs_mut().append_pair(
            "icid",
            "home-home-nav_tracking-zcom-main_menu_wrapper-stock_screener",
        );

        let res = self.client.get(url).send().await?;
        if res.status() != StatusCode::OK {
            return Err(ScrapeError::ContextPageFailed(res.status().as_u16()));
        }
        let body = res.text().await?;
        let key = extract_context_key(&body, &self.api)?;

        debug!("context key bound ({} chars)", key.len());
        self.context_key = Some(key.clone());
        self.state = SessionState::ContextBound;
        Ok(key)
    }

    /// Opens the screener API session. The API host differs from the login
    /// host, so login-domain cookies are forwarded by hand.
    pub async fn establish_api_session(&mut self, context_key: &str) -> Result<()> {
        self.expect_state(SessionState::ContextBound)?;

        let mut url = self.api.clone();
        url.query_pairs_mut()
            .append_pair("scr_type", "stock")
            .append_pair("c_id", "zacks")
            .append_pair("c_key", context_key)
            .append_pair("ref", "screening");

        let mut req = self.client.get(url.clone());
        if let Some(cookies) = self.cross_host_cookies(&url, &[]) {
            req = req.header(COOKIE, cookies);
        }

        let res = req.send().await?;
        if res.status() != StatusCode::OK {
            return Err(ScrapeError::SessionInitFailed(res.status().as_u16()));
        }

        self.context_key = Some(context_key.to_string());
        self.state = SessionState::Ready;
        info!("🔗 Screener API session ready");
        Ok(())
    }

    /// Mirrors the browser's reset call. Callers treat failures as warnings.
    pub async fn reset_query_state(&self) -> Result<()> {
        self.expect_state(SessionState::Ready)?;

        let mut url = self.api.join("/reset_param.php")?;
        url.query_pairs_mut()
            .append_pair("_", &Utc::now().timestamp_millis().to_string())
            .append_pair("mode", "new");

        let res = self.client.get(url).send().await?;
        if res.status() != StatusCode::OK {
            warn!("reset_param returned {}", res.status());
            return Err(ScrapeError::ResetFailed(res.status().as_u16()));
        }
        Ok(())
    }

    /// Cookie header for `target`: its own jar cookies, then any login-domain
    /// cookies not already present, then `extra`.
    pub fn cross_host_cookies(&self, target: &Url, extra: &[(&str, &str)]) -> Option<HeaderValue> {
        let mut pairs: Vec<(String, String)> = Vec::new();

        for source in [target, &self.site] {
            if let Some(header) = self.jar.cookies(source) {
                for (name, value) in split_cookie_header(header.to_str().unwrap_or("")) {
                    if !pairs.iter().any(|(n, _)| *n == name) {
                        pairs.push((name, value));
                    }
                }
            }
        }

        for (name, value) in extra {
            pairs.retain(|(n, _)| n != name);
            pairs.push((name.to_string(), value.to_string()));
        }

        if pairs.is_empty() {
            return None;
        }

        let joined = pairs
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }

    /// Referer the screener frontend sends from inside its iframe.
    pub(crate) fn screener_referer(&self) -> String {
        let mut url = self.api.clone();
        url.query_pairs_mut()
            .append_pair("scr_type", "stock")
            .append_pair("c_id", "zacks")
            .append_pair("c_key", self.context_key.as_deref().unwrap_or(""))
            .append_pair("ref", "screening");
        url.to_string()
    }
}

fn split_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|kv| {
            let (name, value) = kv.trim().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// The key is the `c_key` query parameter of the screener iframe's `src`.
pub fn extract_context_key(body: &str, api: &Url) -> Result<String> {
    let src = strip_between(IFRAME_LEFT, IFRAME_RIGHT, body);
    if src.is_empty() {
        return Err(ScrapeError::ContextKeyNotFound);
    }

    let src = src.replace("&amp;", "&");
    let parsed = match Url::parse(&src) {
        Ok(u) => u,
        Err(_) => api.join(&src).map_err(|_| ScrapeError::ContextKeyNotFound)?,
    };

    parsed
        .query_pairs()
        .find(|(k, _)| k == "c_key")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ScrapeError::ContextKeyNotFound)
}
