//! Blocking transport backed by `reqwest`.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use tracing::debug;

use super::{HttpRequest, HttpResponse, Method, Transport, cookie_header, parse_set_cookie};
use crate::config::ForumConfig;
use crate::error::Result;

/// Real network transport.
///
/// Redirect handling is a client-level setting in `reqwest`, so two clients
/// are kept: one that follows redirects and one that stops at the first
/// response. Cookies are managed by the session, not by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    following: Client,
    direct: Client,
}

impl ReqwestTransport {
    /// Builds clients using the user agent and timeout from `config`.
    pub fn new(config: &ForumConfig) -> Result<Self> {
        let build = |policy: Policy| {
            let mut builder = Client::builder().user_agent(config.user_agent.clone()).redirect(policy);
            if let Some(timeout) = config.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build()
        };
        Ok(Self {
            following: build(Policy::limited(10))?,
            direct: build(Policy::none())?,
        })
    }

    fn builder(&self, request: &HttpRequest) -> RequestBuilder {
        let client = if request.follow_redirects { &self.following } else { &self.direct };
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        if let Some(cookies) = cookie_header(&request.cookies) {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(target: "tbg.transport", method = %request.method, url = %request.url, "sending request");
        let response = self.builder(request).send()?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.text()?;

        debug!(target: "tbg.transport", status, url = %url, bytes = body.len(), "received response");
        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
            cookies,
        })
    }
}
