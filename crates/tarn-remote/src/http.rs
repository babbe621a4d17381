//! Bearer-Authenticated HTTPS Transport
//!
//! One connection per request over hyper's HTTP/1.1 client conn, with
//! rustls for HTTPS (webpki roots). Small and predictable: the activation
//! flow makes a handful of sequential calls per attempt, so connection
//! pooling buys nothing here.

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use hyper::{Method, Request};
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tarn_core::RemoteError;
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::{Position, Url};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const AGENT: &str = concat!("tarn/", env!("CARGO_PKG_VERSION"));

/// Maximum bytes of an error body echoed into `ServerError` detail.
const ERROR_DETAIL_LIMIT: usize = 200;

pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// GET `url`, returning the response body.
    pub async fn get(&self, url: &Url, token: &str) -> Result<Vec<u8>, RemoteError> {
        self.request(Method::GET, url, token, None).await
    }

    /// POST a urlencoded form to `url`, returning the response body.
    pub async fn post_form(
        &self,
        url: &Url,
        token: &str,
        form: &[(&str, &str)],
    ) -> Result<Vec<u8>, RemoteError> {
        let encoded = {
            let mut body = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in form {
                body.append_pair(name, value);
            }
            body.finish().into_bytes()
        };
        self.request(Method::POST, url, token, Some(encoded)).await
    }

    async fn request(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, RemoteError> {
        let round_trip = self.round_trip(method, url, token, body);
        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Transport(format!(
                "request to {url} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn round_trip(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, RemoteError> {
        let host = url
            .host_str()
            .ok_or_else(|| RemoteError::Transport(format!("no host in URL {url}")))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RemoteError::Transport(format!("no port for URL {url}")))?;
        let is_https = url.scheme() == "https";

        let host_header = match url.port() {
            Some(explicit) => format!("{host}:{explicit}"),
            None => host.clone(),
        };

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&url[Position::BeforePath..])
            .header(HOST, host_header)
            .header(USER_AGENT, AGENT)
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        debug!("{} {}", method, url);

        let stream = tokio::net::TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| RemoteError::Transport(format!("connect {host}:{port}: {e}")))?;

        let response = if is_https {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let tls_config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let connector = TlsConnector::from(Arc::new(tls_config));
            let server_name = rustls::pki_types::ServerName::try_from(host.clone())
                .map_err(|_| RemoteError::Transport(format!("invalid server name {host}")))?;
            let tls_stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| RemoteError::Transport(format!("TLS handshake: {e}")))?;
            self.send(hyper_util::rt::TokioIo::new(tls_stream), request)
                .await?
        } else {
            self.send(hyper_util::rt::TokioIo::new(stream), request)
                .await?
        };

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RemoteError::Transport(format!("reading body: {e}")))?
            .to_bytes()
            .to_vec();

        match status.as_u16() {
            200..=299 => Ok(body),
            401 | 403 => Err(RemoteError::Unauthorized),
            code => {
                let snippet = &body[..body.len().min(ERROR_DETAIL_LIMIT)];
                Err(RemoteError::ServerError {
                    status: code,
                    detail: String::from_utf8_lossy(snippet).into_owned(),
                })
            }
        }
    }

    async fn send<S>(
        &self,
        io: hyper_util::rt::TokioIo<S>,
        request: Request<Full<Bytes>>,
    ) -> Result<hyper::Response<hyper::body::Incoming>, RemoteError>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| RemoteError::Transport(format!("HTTP handshake: {e}")))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("connection closed: {e}");
            }
        });
        sender
            .send_request(request)
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}
