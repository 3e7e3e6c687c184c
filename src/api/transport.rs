//! HTTP transport seam.
//!
//! All network I/O goes through the [`Transport`] trait so that the request
//! executor, session manager, and everything above them can be exercised
//! against a scripted double. [`HttpTransport`] is the production
//! implementation over `reqwest`.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;
use thiserror::Error;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP methods used by the tracker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A single outbound request, fully assembled.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// Complete `Authorization` header value, if the call is authenticated.
    pub auth_header: Option<String>,
    /// JSON body; `Content-Type: application/json` is implied when set.
    pub body: Option<Value>,
}

/// The raw outcome of a request that reached the server.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Connection-level failures. Anything that produced an HTTP status is a
/// [`TransportResponse`] instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),
}

/// The seam between the client and the wire.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = std::result::Result<TransportResponse, TransportError>> + Send;
}

/// Production transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport with the given per-call timeout.
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        builder = builder.header(header::ACCEPT, "application/json");
        if let Some(auth) = &request.auth_header {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport double shared by the crate's tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tokio::sync::Semaphore;

    use super::*;

    #[derive(Debug, Clone)]
    pub(crate) enum Scripted {
        Status(u16, String),
        NetworkError,
    }

    /// Replays scripted responses, either from per-path routes or a global
    /// queue, and records every request it sees.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        queue: Mutex<VecDeque<Scripted>>,
        routes: Mutex<Vec<(Method, String, VecDeque<Scripted>)>>,
        log: Mutex<Vec<TransportRequest>>,
        gate: Mutex<Option<Arc<Semaphore>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next unmatched request.
        pub fn push_status(&self, status: u16, body: &str) {
            self.queue
                .lock()
                .unwrap()
                .push_back(Scripted::Status(status, body.to_string()));
        }

        pub fn push_network_error(&self) {
            self.queue.lock().unwrap().push_back(Scripted::NetworkError);
        }

        /// Queue a response for requests whose URL ends with `path`.
        ///
        /// A route's responses pop in order; the last one repeats for every
        /// further request, so polling loops stay deterministic.
        pub fn route_status(&self, method: Method, path: &str, status: u16, body: &str) {
            self.route(method, path, Scripted::Status(status, body.to_string()));
        }

        pub fn route_network_error(&self, method: Method, path: &str) {
            self.route(method, path, Scripted::NetworkError);
        }

        fn route(&self, method: Method, path: &str, scripted: Scripted) {
            let mut routes = self.routes.lock().unwrap();
            if let Some((_, _, queue)) = routes
                .iter_mut()
                .find(|(m, p, _)| *m == method && p == path)
            {
                queue.push_back(scripted);
            } else {
                routes.push((method, path.to_string(), VecDeque::from([scripted])));
            }
        }

        /// Make every request park after being logged until a permit is
        /// released via `add_permits`, so a test can observe requests held
        /// open on the wire.
        pub fn gate(&self) -> Arc<Semaphore> {
            self.gate
                .lock()
                .unwrap()
                .get_or_insert_with(|| Arc::new(Semaphore::new(0)))
                .clone()
        }

        pub fn call_count(&self) -> usize {
            self.log.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<TransportRequest> {
            self.log.lock().unwrap().clone()
        }

        fn next_for(&self, request: &TransportRequest) -> Scripted {
            let mut routes = self.routes.lock().unwrap();
            for (method, path, queue) in routes.iter_mut() {
                if *method == request.method && request.url.ends_with(path.as_str()) {
                    if queue.len() > 1 {
                        return queue.pop_front().unwrap();
                    }
                    if let Some(scripted) = queue.front() {
                        return scripted.clone();
                    }
                }
            }
            drop(routes);
            self.queue.lock().unwrap().pop_front().unwrap_or_else(|| {
                panic!(
                    "no scripted response for {} {}",
                    request.method.as_str(),
                    request.url
                )
            })
        }
    }

    impl Transport for MockTransport {
        async fn execute(
            &self,
            request: TransportRequest,
        ) -> std::result::Result<TransportResponse, TransportError> {
            self.log.lock().unwrap().push(request.clone());
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            match self.next_for(&request) {
                Scripted::Status(status, body) => Ok(TransportResponse { status, body }),
                Scripted::NetworkError => {
                    Err(TransportError::Connect("connection refused".to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_as_str() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(Method::Put.as_str(), "PUT");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_mock_transport_routes_by_path() {
        let mock = mock::MockTransport::new();
        mock.route_status(Method::Get, "/issue/A-1", 200, r#"{"ok":true}"#);
        mock.route_status(Method::Get, "/issue/B-2", 404, "");

        let a = mock
            .execute(TransportRequest {
                method: Method::Get,
                url: "https://tracker.test/rest/api/3/issue/A-1".to_string(),
                auth_header: None,
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(a.status, 200);

        let b = mock
            .execute(TransportRequest {
                method: Method::Get,
                url: "https://tracker.test/rest/api/3/issue/B-2".to_string(),
                auth_header: None,
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(b.status, 404);
        assert_eq!(mock.call_count(), 2);
    }
}
