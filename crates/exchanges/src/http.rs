//! Monoio-native HTTPS transport
//!
//! - Single-threaded async with monoio
//! - Direct TLS integration with rustls
//! - One TLS client configuration (trust roots, session cache) per transport,
//!   shared by every request it issues
//! - HTTP/1.1 with `Connection: close`; chunked bodies are de-chunked

use crate::errors::{ExchangeError, Result};
use crate::traits::Transport;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const IO_CHUNK: usize = 8192;

/// Monoio-native HTTPS client
pub struct MonoioHttpsClient {
    tls_config: Arc<ClientConfig>,
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl MonoioHttpsClient {
    /// Client trusting the bundled webpki roots
    pub fn new() -> Result<Self> {
        Self::with_ca_file(None)
    }

    /// Client trusting the webpki roots plus every certificate in a PEM bundle
    pub fn with_ca_file(ca_file: Option<&Path>) -> Result<Self> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(path) = ca_file {
            let pem = std::fs::read_to_string(path).map_err(|e| {
                ExchangeError::ConfigurationError(format!("cannot read CA bundle {}: {e}", path.display()))
            })?;
            let certs = parse_pem_certificates(&pem)?;
            if certs.is_empty() {
                return Err(ExchangeError::ConfigurationError(format!(
                    "no certificates in CA bundle {}",
                    path.display()
                )));
            }
            let count = certs.len();
            for cert in certs {
                root_store
                    .add(cert)
                    .map_err(|e| ExchangeError::TlsError(format!("rejected CA certificate: {e}")))?;
            }
            info!("🔐 Loaded {} CA certificate(s) from {}", count, path.display());
        }

        let tls_config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            tls_config: Arc::new(tls_config),
        })
    }

    /// Make an HTTPS GET request
    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.request("GET", url, None, headers).await
    }

    /// Make an HTTPS POST request
    pub async fn post(&self, url: &str, body: Option<&str>, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.request("POST", url, body, headers).await
    }

    /// Make an HTTPS request with custom headers
    pub async fn request(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let parsed_url = Url::parse(url)?;
        let host = parsed_url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl(format!("no host in {url}")))?
            .to_string();
        let port = parsed_url.port_or_known_default().unwrap_or(443);

        let tcp_stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("TCP connect to {host}:{port} failed: {e}")))?;

        let server_name = ServerName::try_from(host.as_str())
            .map(|name| name.to_owned())
            .map_err(|e| ExchangeError::TlsError(format!("invalid server name {host}: {e:?}")))?;
        let tls_conn = ClientConnection::new(self.tls_config.clone(), server_name)
            .map_err(|e| ExchangeError::TlsError(format!("TLS setup failed: {e}")))?;

        let mut tls_stream = TlsStream::new(tcp_stream, tls_conn);
        let request = build_request(method, &host, &request_target(&parsed_url), body, headers);
        tls_stream.write_all(request.as_bytes()).await?;

        let raw = tls_stream.read_to_end().await?;
        parse_http_response(&raw)
    }
}

/// [`Transport`] over [`MonoioHttpsClient`] rooted at a venue base URL
pub struct HttpTransport {
    base_url: Url,
    client: MonoioHttpsClient,
}

impl HttpTransport {
    pub fn new(base_url: &str, ca_file: Option<&Path>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = MonoioHttpsClient::with_ca_file(ca_file)?;
        info!("🔗 HTTPS transport ready for {}", base_url);
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `path` appended to the base URL's own path, keeping any prefix
    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        url.set_path(&format!("{prefix}/{suffix}"));
        Ok(url)
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn get_request(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!("📡 GET {}", url);
        let response = self.client.get(url.as_str(), &[]).await?;
        decode_document(response)
    }

    async fn post_request(&self, path: &str, headers: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!("📡 POST {}", url);
        let response = self.client.post(url.as_str(), None, headers).await?;
        decode_document(response)
    }
}

/// Turn a response body into a document.
///
/// JSON bodies are returned whatever the status, since venue error documents
/// carry their own `message` field.
pub fn decode_document(response: HttpResponse) -> Result<Value> {
    match serde_json::from_str::<Value>(&response.body) {
        Ok(document) => Ok(document),
        Err(e) if response.is_success() => Err(ExchangeError::SerializationError(format!(
            "{e}: {}",
            response.body
        ))),
        Err(_) => Err(ExchangeError::HttpError(response.status, response.body)),
    }
}

fn request_target(url: &Url) -> String {
    let mut target = url.path().to_string();
    if target.is_empty() {
        target.push('/');
    }
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

fn build_request(method: &str, host: &str, target: &str, body: Option<&str>, headers: &[(&str, &str)]) -> String {
    let body = body.unwrap_or("");
    let mut request = format!(
        "{method} {target} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: Tradelink/1.0\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         Content-Length: {}\r\n",
        body.len()
    );
    for (key, value) in headers {
        request.push_str(&format!("{key}: {value}\r\n"));
    }
    request.push_str("\r\n");
    request.push_str(body);
    request
}

/// Parse a complete HTTP/1.1 response read up to connection close
pub fn parse_http_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find(data, b"\r\n\r\n", 0)
        .ok_or_else(|| ExchangeError::NetworkError("invalid HTTP response: no header terminator".to_string()))?;

    let head = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = head.lines();

    let status_line = lines
        .next()
        .ok_or_else(|| ExchangeError::NetworkError("empty HTTP response".to_string()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ExchangeError::NetworkError(format!("invalid status line: {status_line}")))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let mut response = HttpResponse {
        status,
        headers,
        body: String::new(),
    };

    let raw_body = &data[header_end + 4..];
    let chunked = response
        .header("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));

    let body = if chunked {
        decode_chunked(raw_body)?
    } else {
        let length = response
            .header("Content-Length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(raw_body.len())
            .min(raw_body.len());
        raw_body[..length].to_vec()
    };

    response.body = String::from_utf8_lossy(&body).into_owned();
    Ok(response)
}

/// Reassemble a `Transfer-Encoding: chunked` body
pub fn decode_chunked(data: &[u8]) -> Result<Vec<u8>> {
    let malformed = |what: &str| ExchangeError::InvalidResponse(format!("malformed chunked body: {what}"));
    let mut body = Vec::with_capacity(data.len());
    let mut pos = 0;

    loop {
        let line_end = find(data, b"\r\n", pos).ok_or_else(|| malformed("missing chunk size"))?;
        let size_line = String::from_utf8_lossy(&data[pos..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed("bad chunk size"))?;
        pos = line_end + 2;

        if size == 0 {
            return Ok(body);
        }
        let end = pos
            .checked_add(size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| malformed("truncated chunk"))?;
        body.extend_from_slice(&data[pos..end]);
        pos = end.checked_add(2).ok_or_else(|| malformed("truncated chunk"))?;
    }
}

/// DER certificates from every `CERTIFICATE` block of a PEM bundle
pub fn parse_pem_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>> {
    const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
    const END: &str = "-----END CERTIFICATE-----";

    let mut certs = Vec::new();
    let mut rest = pem;
    while let Some(start) = rest.find(BEGIN) {
        let after = &rest[start + BEGIN.len()..];
        let stop = after
            .find(END)
            .ok_or_else(|| ExchangeError::ConfigurationError("unterminated PEM certificate".to_string()))?;
        let encoded: String = after[..stop].chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD
            .decode(encoded)
            .map_err(|e| ExchangeError::ConfigurationError(format!("invalid PEM certificate: {e}")))?;
        certs.push(CertificateDer::from(der));
        rest = &after[stop + END.len()..];
    }
    Ok(certs)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

/// TLS session over a monoio TCP stream
struct TlsStream {
    stream: TcpStream,
    tls_conn: ClientConnection,
    handshake_complete: bool,
}

impl TlsStream {
    fn new(stream: TcpStream, tls_conn: ClientConnection) -> Self {
        Self {
            stream,
            tls_conn,
            handshake_complete: false,
        }
    }

    /// Send every pending TLS record
    async fn flush_tls(&mut self) -> Result<()> {
        while self.tls_conn.wants_write() {
            let mut records = Vec::with_capacity(IO_CHUNK);
            self.tls_conn
                .write_tls(&mut records)
                .map_err(|e| ExchangeError::TlsError(format!("TLS write failed: {e}")))?;
            if !records.is_empty() {
                let (result, _) = self.stream.write_all(records).await;
                result.map_err(|e| ExchangeError::NetworkError(format!("TCP write failed: {e}")))?;
            }
        }
        Ok(())
    }

    /// Feed one TCP read into the TLS state machine; 0 means the peer closed
    async fn fill_tls(&mut self) -> Result<usize> {
        let (result, buf) = self.stream.read(vec![0u8; IO_CHUNK]).await;
        let bytes_read = result.map_err(|e| ExchangeError::NetworkError(format!("TCP read failed: {e}")))?;
        if bytes_read == 0 {
            return Ok(0);
        }

        self.tls_conn
            .read_tls(&mut std::io::Cursor::new(&buf[..bytes_read]))
            .map_err(|e| ExchangeError::TlsError(format!("TLS read failed: {e}")))?;
        self.tls_conn
            .process_new_packets()
            .map_err(|e| ExchangeError::TlsError(format!("TLS process failed: {e}")))?;
        Ok(bytes_read)
    }

    async fn complete_handshake(&mut self) -> Result<()> {
        if self.handshake_complete {
            return Ok(());
        }

        while self.tls_conn.is_handshaking() {
            self.flush_tls().await?;
            if !self.tls_conn.is_handshaking() {
                break;
            }
            if !self.tls_conn.wants_read() {
                return Err(ExchangeError::TlsError("TLS handshake stalled".to_string()));
            }
            if self.fill_tls().await? == 0 {
                return Err(ExchangeError::NetworkError("connection closed during handshake".to_string()));
            }
        }

        self.flush_tls().await?;
        self.handshake_complete = true;
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.complete_handshake().await?;

        self.tls_conn
            .writer()
            .write_all(data)
            .map_err(|e| ExchangeError::TlsError(format!("TLS application write failed: {e}")))?;

        self.flush_tls().await
    }

    /// Read plaintext until the peer closes the connection
    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        self.complete_handshake().await?;

        let mut response_data = Vec::new();
        let mut plaintext = vec![0u8; IO_CHUNK];

        loop {
            match self.tls_conn.reader().read(&mut plaintext) {
                // close_notify received
                Ok(0) => break,
                Ok(n) => {
                    response_data.extend_from_slice(&plaintext[..n]);
                    continue;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                // TCP closed without close_notify; everything before it is usable
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(ExchangeError::TlsError(format!("TLS read failed: {e}"))),
            }

            if self.fill_tls().await? == 0 {
                break;
            }
        }

        Ok(response_data)
    }
}
