use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::Serialize;
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif", "webp", "ico"];
const STATIC_EXTENSIONS: &[&str] = &["js", "css", "woff", "woff2", "ttf", "eot"];

const MINUTE_SECS: u64 = 60;
const DAY_SECS: u64 = 24 * 60 * 60;

/// How a matched request is served by the web build's service worker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    #[serde(rename_all = "camelCase")]
    NetworkFirst { network_timeout_seconds: u64 },
    CacheFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expiration {
    pub max_entries: u32,
    pub max_age_seconds: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRule {
    pub cache_name: &'static str,
    pub strategy: Strategy,
    pub expiration: Expiration,
    #[serde(skip)]
    matcher: Matcher,
}

#[derive(Clone, Debug, PartialEq)]
enum Matcher {
    /// Calls to the hosted backend, by host suffix.
    BackendApi,
    /// Requests whose path ends in one of the listed extensions.
    Extension(&'static [&'static str]),
    /// Page navigations: http(s) URLs with an extensionless path.
    Navigation,
}

/// The web build's declarative caching policy. Rules are evaluated in
/// order and the first match wins, so API traffic is claimed before the
/// broader asset and navigation rules see it.
#[derive(Clone, Debug)]
pub struct CachePolicy {
    api_host_suffix: String,
    rules: Vec<CacheRule>,
}

impl CachePolicy {
    pub fn new(api_host_suffix: impl Into<String>) -> Self {
        let rules = vec![
            CacheRule {
                cache_name: "api-cache",
                strategy: Strategy::NetworkFirst {
                    network_timeout_seconds: 10,
                },
                expiration: Expiration {
                    max_entries: 50,
                    max_age_seconds: 5 * MINUTE_SECS,
                },
                matcher: Matcher::BackendApi,
            },
            CacheRule {
                cache_name: "image-cache",
                strategy: Strategy::CacheFirst,
                expiration: Expiration {
                    max_entries: 100,
                    max_age_seconds: 30 * DAY_SECS,
                },
                matcher: Matcher::Extension(IMAGE_EXTENSIONS),
            },
            CacheRule {
                cache_name: "static-resources",
                strategy: Strategy::CacheFirst,
                expiration: Expiration {
                    max_entries: 60,
                    max_age_seconds: 30 * DAY_SECS,
                },
                matcher: Matcher::Extension(STATIC_EXTENSIONS),
            },
            CacheRule {
                cache_name: "navigation-cache",
                strategy: Strategy::NetworkFirst {
                    network_timeout_seconds: 10,
                },
                expiration: Expiration {
                    max_entries: 20,
                    max_age_seconds: DAY_SECS,
                },
                matcher: Matcher::Navigation,
            },
        ];
        Self {
            api_host_suffix: api_host_suffix.into(),
            rules,
        }
    }

    pub fn rules(&self) -> &[CacheRule] {
        &self.rules
    }

    /// First rule claiming the URL, or `None` when the request bypasses
    /// the cache entirely.
    pub fn policy_for(&self, url: &Url) -> Option<&CacheRule> {
        self.rules.iter().find(|rule| self.matches(&rule.matcher, url))
    }

    /// The rule set as JSON for the web build tooling.
    pub fn manifest_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.rules)
            .wrap_err("failed to serialize cache manifest")
    }

    fn matches(&self, matcher: &Matcher, url: &Url) -> bool {
        match matcher {
            Matcher::BackendApi => url
                .host_str()
                .is_some_and(|host| host.ends_with(&self.api_host_suffix)),
            Matcher::Extension(extensions) => path_extension(url)
                .is_some_and(|extension| extensions.contains(&extension)),
            Matcher::Navigation => {
                matches!(url.scheme(), "http" | "https")
                    && path_extension(url).is_none()
            }
        }
    }
}

fn path_extension(url: &Url) -> Option<&str> {
    let segment = url.path_segments()?.next_back()?;
    let (_, extension) = segment.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension)
    }
}
