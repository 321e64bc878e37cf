//! Outbound HTTP requests.
//!
//! [`HttpClient`] sends one blocking request and hands back status, headers and body text.
//! Statuses outside 2xx are still responses; only transport failures are errors. Other
//! collaborators talk to the network through the [`Transport`] trait so they can be exercised
//! without one.

use std::collections::HashMap;
use std::io;

use http::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to encode request body: {source}")]
    Encode {
        #[from]
        source: serde_json::Error,
    },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: ureq::Transport,
    },

    #[error("failed to read response body: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ClientError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// A request to send. A present `body` is sent as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), body: None, headers: Vec::new() }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What came back, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: String,
}

impl ClientResponse {
    /// Parses `data` as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> Result<ClientResponse, ClientError>;
}

/// Blocking client backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_agent(ureq::AgentBuilder::new().build())
    }

    /// Uses a preconfigured agent, e.g. one with a proxy or custom TLS.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }

    /// Sends `method url` with an optional JSON body and extra headers.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Result<ClientResponse, ClientError> {
        let mut request = OutboundRequest::new(method, url);
        request.body = body;
        request.headers = headers.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        self.send(request)
    }
}

impl Transport for HttpClient {
    fn send(&self, request: OutboundRequest) -> Result<ClientResponse, ClientError> {
        let mut outbound = self.agent.request(request.method.as_str(), &request.url);

        let encoded = request.body.as_ref().map(serde_json::to_string).transpose()?;
        if encoded.is_some() {
            outbound = outbound.set(http::header::CONTENT_TYPE.as_str(), mime::APPLICATION_JSON.as_ref());
        }
        for (name, value) in &request.headers {
            outbound = outbound.set(name, value);
        }

        let result = match encoded {
            Some(body) => outbound.send_string(&body),
            None => outbound.call(),
        };
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let data = response.into_string()?;

        debug!(method = %request.method, url = %request.url, status, "outbound request finished");
        Ok(ClientResponse { status, headers, data })
    }
}
