//! Single-shot HTTP GET used by every upstream client.

use async_trait::async_trait;
use reqwest::{Client, redirect};
use std::{fmt::Debug, time::Duration};
use tracing::debug;

use crate::{
    config::HttpConfig,
    error::{RainError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
}

/// Status, body and the cookies the server set. Non-2xx statuses are not errors here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub cookies: Vec<ResponseCookie>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(ResponseCookie {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues one GET without following redirects.
#[async_trait]
pub trait Fetch: Send + Sync + Debug {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse>;
}

/// [`Fetch`] over `reqwest`. No cookie store: nothing leaks between calls.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    http: Client,
    retries: u32,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            retries: config.retries,
        })
    }

    async fn get_once(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse> {
        let mut req = self.http.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let res = req.send().await?;
        let status = res.status().as_u16();
        let cookies = res
            .cookies()
            .map(|c| ResponseCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
            })
            .collect();
        let body = res.text().await?;

        Ok(FetchResponse {
            status,
            body,
            cookies,
        })
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse> {
        let mut attempt = 0;
        loop {
            match self.get_once(url, headers).await {
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    debug!(url, attempt, error = %err, "retrying GET");
                }
                other => return other,
            }
        }
    }
}

/// Body of a 200 response; any other status or an empty body is an error.
pub(crate) fn ok_body(url: &str, res: FetchResponse) -> Result<String> {
    if !res.is_ok() {
        return Err(RainError::Transport {
            url: url.to_string(),
            status: res.status,
        });
    }
    if res.body.is_empty() {
        return Err(RainError::EmptyBody {
            url: url.to_string(),
        });
    }
    Ok(res.body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{Mutex, PoisonError},
    };

    /// Canned responses keyed by exact URL; records every request it sees.
    #[derive(Debug, Default)]
    pub struct FakeFetcher {
        responses: HashMap<String, FetchResponse>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(mut self, url: &str, response: FetchResponse) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }

        pub fn headers_for(&self, url: &str) -> Vec<(String, String)> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, h)| h.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((
                    url.to_string(),
                    headers
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ));
            Ok(self
                .responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| FetchResponse::new(404, "")))
        }
    }
}
