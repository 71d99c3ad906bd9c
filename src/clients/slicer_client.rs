/// PDF 切片服务客户端
///
/// 页数未知时由服务端负责页码越界校验
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tracing::debug;

use crate::clients::backend_client::check_status;
use crate::error::{AppError, AppResult, PersistenceError};

/// PDF 切片服务
pub trait PdfSlicer: Send + Sync {
    /// 读取 PDF 页数
    fn page_count<'a>(&'a self, pdf: &'a [u8]) -> BoxFuture<'a, AppResult<u32>>;

    /// 按范围描述切出指定页，返回新的 PDF
    fn slice<'a>(&'a self, pdf: &'a [u8], spec: &'a str) -> BoxFuture<'a, AppResult<Vec<u8>>>;
}

#[derive(Debug, Deserialize)]
struct PageCountResponse {
    page_count: u32,
}

/// 基于 HTTP 的切片服务
///
/// - `POST {base}/pages`（body 为 PDF）→ `{"page_count": n}`
/// - `POST {base}/slice?pages=1-3,5`（body 为 PDF）→ 切片后的 PDF
pub struct HttpPdfSlicer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPdfSlicer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::persistence("build client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn page_count_impl(&self, pdf: &[u8]) -> AppResult<u32> {
        let url = format!("{}/pages", self.base_url);
        debug!("读取页数: POST {} ({} 字节)", url, pdf.len());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec())
            .send()
            .await
            .map_err(|e| AppError::persistence("page_count", e))?;

        let response = check_status("page_count", response).await?;
        let body: PageCountResponse = response.json().await.map_err(|e| {
            AppError::Persistence(PersistenceError::MalformedResponse {
                operation: "page_count".to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(body.page_count)
    }

    async fn slice_impl(&self, pdf: &[u8], spec: &str) -> AppResult<Vec<u8>> {
        let url = format!("{}/slice", self.base_url);
        debug!("切片: POST {} pages={}", url, spec);

        let response = self
            .client
            .post(&url)
            .query(&[("pages", spec)])
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec())
            .send()
            .await
            .map_err(|e| AppError::persistence("slice", e))?;

        let response = check_status("slice", response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::persistence("slice", e))?;
        Ok(bytes.to_vec())
    }
}

impl PdfSlicer for HttpPdfSlicer {
    fn page_count<'a>(&'a self, pdf: &'a [u8]) -> BoxFuture<'a, AppResult<u32>> {
        self.page_count_impl(pdf).boxed()
    }

    fn slice<'a>(&'a self, pdf: &'a [u8], spec: &'a str) -> BoxFuture<'a, AppResult<Vec<u8>>> {
        self.slice_impl(pdf, spec).boxed()
    }
}
