use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{info, instrument, warn};

use crate::api::models::{AddProductRequest, ApiProduct};
use crate::error::{CatalogError, CatalogResult};

const LIST_PATH: &str = "public/get";
const ADD_PATH: &str = "public/add";
const FILE_PART: &str = "files[]";

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Remote side of the catalog. The sync policy only talks to this seam.
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// Full product collection, in the order the remote returns it.
    async fn fetch_products(&self) -> CatalogResult<Vec<ApiProduct>>;

    /// Submit a new product. Success is decided by status alone.
    async fn add_product(&self, request: AddProductRequest) -> CatalogResult<()>;
}

/// reqwest-backed client for the public catalog endpoints.
///
/// - GET  `{base}public/get` returns a JSON array of products
/// - POST `{base}public/add` takes multipart fields plus an optional `files[]` part
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    http: Client,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("prodspec/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Remote {
                status: None,
                message: Some(format!("http client init: {e}")),
            })?;
        Ok(Self::with_http(base_url, http))
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, test setups).
    pub fn with_http(base_url: &str, http: Client) -> Self {
        Self {
            base_url: crate::util::env::normalize_base_url(base_url),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(resp: Response, url: &str) -> CatalogResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = truncate_for_log(resp.text().await.unwrap_or_default(), 512);
        warn!(%status, url, body = %body, "catalog request rejected");
        let message = if body.trim().is_empty() {
            status.canonical_reason().map(str::to_string)
        } else {
            Some(body)
        };
        Err(CatalogError::Remote {
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl ProductApi for CatalogClient {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn fetch_products(&self) -> CatalogResult<Vec<ApiProduct>> {
        let url = self.endpoint(LIST_PATH);
        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let resp = Self::ensure_success(resp, &url).await?;
        let products: Vec<ApiProduct> = resp.json().await.map_err(|e| CatalogError::Remote {
            status: None,
            message: Some(format!("undecodable product list: {e}")),
        })?;
        info!(count = products.len(), "fetched remote products");
        Ok(products)
    }

    #[instrument(skip(self, request), fields(product = %request.product_name))]
    async fn add_product(&self, request: AddProductRequest) -> CatalogResult<()> {
        let mut form = Form::new()
            .text("product_name", request.product_name)
            .text("product_type", request.product_type)
            .text("price", request.price)
            .text("tax", request.tax);

        if let Some(image) = request.image {
            let bytes = tokio::fs::read(&image.path)
                .await
                .map_err(|e| CatalogError::Image(format!("read staged image: {e}")))?;
            let part = Part::bytes(bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)
                .map_err(|e| CatalogError::Image(format!("bad content type: {e}")))?;
            form = form.part(FILE_PART, part);
        }

        let url = self.endpoint(ADD_PATH);
        let resp = self.http.post(&url).multipart(form).send().await?;
        Self::ensure_success(resp, &url).await?;
        info!("product submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StagedImage;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Accept one connection, capture the full request, reply with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (base, handle)
    }

    fn client(base: &str) -> CatalogClient {
        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        CatalogClient::with_http(base, http)
    }

    #[test]
    fn base_url_is_normalized() {
        let c = CatalogClient::new("http://127.0.0.1:1/api", Duration::from_secs(1)).unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:1/api/");
        assert_eq!(c.endpoint(LIST_PATH), "http://127.0.0.1:1/api/public/get");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = truncate_for_log("ééééé".to_string(), 3);
        assert_eq!(s, "é…");
    }

    #[tokio::test]
    async fn fetch_decodes_product_list() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":1,"image":"","price":"99.5","product_name":"Lamp","product_type":"Other","tax":5}]"#,
        )
        .await;
        let products = client(&base).fetch_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_name, "Lamp");
        assert_eq!(products[0].price, 99.5);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/public/get HTTP/1.1"));
    }

    #[tokio::test]
    async fn server_errors_are_remote_not_connectivity() {
        let (base, _server) = serve_once("500 Internal Server Error", "boom").await;
        let err = client(&base).fetch_products().await.unwrap_err();
        assert!(!err.is_connectivity());
        match err {
            CatalogError::Remote { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message.as_deref(), Some("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_a_remote_error() {
        let (base, _server) = serve_once("200 OK", "{\"not\":\"a list\"}").await;
        let err = client(&base).fetch_products().await.unwrap_err();
        assert!(matches!(err, CatalogError::Remote { status: None, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_connectivity() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}/api/"))
            .fetch_products()
            .await
            .unwrap_err();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn add_sends_multipart_fields_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1700000000000_42.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nfake").unwrap();

        let (base, server) = serve_once("200 OK", "{}").await;
        let request = AddProductRequest {
            product_name: "Desk Lamp".into(),
            product_type: "Home & Kitchen".into(),
            price: "1499".into(),
            tax: "18".into(),
            image: Some(StagedImage {
                path,
                file_name: "1700000000000_42.png".into(),
                content_type: "image/png".into(),
            }),
        };
        client(&base).add_product(request).await.unwrap();

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/public/add HTTP/1.1"));
        assert!(raw.contains("multipart/form-data; boundary="));
        assert!(raw.contains("name=\"product_name\"\r\n\r\nDesk Lamp"));
        assert!(raw.contains("name=\"product_type\"\r\n\r\nHome & Kitchen"));
        assert!(raw.contains("name=\"price\"\r\n\r\n1499"));
        assert!(raw.contains("name=\"tax\"\r\n\r\n18"));
        assert!(raw.contains("name=\"files[]\"; filename=\"1700000000000_42.png\""));
        assert!(raw.to_ascii_lowercase().contains("content-type: image/png"));
    }

    #[tokio::test]
    async fn add_without_image_has_no_file_part() {
        let (base, server) = serve_once("201 Created", "").await;
        let request = AddProductRequest {
            product_name: "Mug".into(),
            product_type: "Other".into(),
            price: "10".into(),
            tax: "1".into(),
            image: None,
        };
        client(&base).add_product(request).await.unwrap();
        let raw = server.await.unwrap();
        assert!(!raw.contains("files[]"));
    }
}
