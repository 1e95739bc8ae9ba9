//! Server-side page fetching and text extraction

use affectlens_classifiers::truncate_chars;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::{redirect, Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::security::{check_ip, check_url, validate_url, SecurityError, UrlPolicy};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; affectlens/0.1; +https://docs.skelfresearch.com/affectlens)";

/// Extracted text shorter than this is rejected
const MIN_TEXT_CHARS: usize = 10;

const MAX_REDIRECTS: usize = 10;

/// Subtrees dropped before extracting text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header"];

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Blocked(#[from] SecurityError),

    #[error("Failed to fetch URL: HTTP {}", .0.as_u16())]
    Status(StatusCode),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not extract meaningful text from URL")]
    NoText,
}

/// Text pulled from a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedPage {
    pub url: String,
    pub text: String,
    pub title: Option<String>,
    /// Length of `text` in characters
    pub length: usize,
}

/// HTTP client that validates every hop and extracts readable text
pub struct UrlFetcher {
    http: Client,
    policy: UrlPolicy,
    max_chars: usize,
}

impl UrlFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let policy = UrlPolicy {
            allow_http: config.allow_http,
            allow_private: config.allow_private,
        };

        let redirects = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if let Err(e) = check_url(attempt.url(), policy) {
                attempt.error(e)
            } else {
                attempt.follow()
            }
        });

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirects)
            .dns_resolver(Arc::new(GuardedResolver { policy }))
            .build()?;

        Ok(Self {
            http,
            policy,
            max_chars: config.max_chars,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = validate_url(url, self.policy)?;
        info!(url = %parsed, "Fetching URL");

        let response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %parsed, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::Status(status));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let page = extract_page(&html, self.max_chars);
        if page.text.chars().count() < MIN_TEXT_CHARS {
            return Err(FetchError::NoText);
        }

        Ok(FetchedPage {
            url: parsed.to_string(),
            length: page.text.chars().count(),
            text: page.text,
            title: page.title,
        })
    }
}

/// Resolver that refuses hosts whose addresses the policy blocks, so a
/// public hostname cannot point the fetcher at an internal address
struct GuardedResolver {
    policy: UrlPolicy,
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let policy = self.policy;
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolve_allowed(&host, policy).await?;
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

/// Resolve `host`, failing if any of its addresses is blocked
async fn resolve_allowed(
    host: &str,
    policy: UrlPolicy,
) -> Result<Vec<SocketAddr>, Box<dyn StdError + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    if let Some(blocked) = addrs.iter().find(|a| check_ip(a.ip(), policy).is_err()) {
        warn!(host, address = %blocked.ip(), "Hostname resolves to a blocked address");
        return Err(Box::new(SecurityError::BlockedHost(host.to_string())));
    }
    Ok(addrs)
}

/// Surface resolver refusals as blocked URLs rather than network errors
fn send_error(err: reqwest::Error) -> FetchError {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(SecurityError::BlockedHost(host)) = inner.downcast_ref::<SecurityError>() {
            return FetchError::Blocked(SecurityError::BlockedHost(host.clone()));
        }
        source = inner.source();
    }
    FetchError::Network(err.to_string())
}

pub(crate) struct ExtractedText {
    pub text: String,
    pub title: Option<String>,
}

/// Visible text with whitespace collapsed, cut to `max_chars` plus `...`
pub(crate) fn extract_page(html: &str, max_chars: usize) -> ExtractedText {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    let mut text = collapse_whitespace(&raw);

    if text.chars().count() > max_chars {
        text = format!("{}...", truncate_chars(&text, max_chars));
    }

    ExtractedText { text, title }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
