/// 文档后端客户端
///
/// 封装文档的创建 / 更新 / 读取调用
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::document::Document;

/// 文档后端
///
/// 超时由实现方负责，统一以 `PersistenceError` 返回。
pub trait DocumentBackend: Send + Sync {
    /// 创建文档，返回后端分配的 ID
    fn create<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, AppResult<String>>;

    /// 用已有 ID 覆盖文档
    fn update<'a>(&'a self, document_id: &'a str, document: &'a Document) -> BoxFuture<'a, AppResult<()>>;

    /// 读取文档；不存在时返回 `AppError::NotFound`
    fn get<'a>(&'a self, document_id: &'a str) -> BoxFuture<'a, AppResult<Document>>;
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    document_id: String,
}

/// 基于 HTTP 的文档后端
///
/// - `POST {base}/documents` → `{"document_id": "..."}`
/// - `PUT {base}/documents/{id}`
/// - `GET {base}/documents/{id}`
pub struct HttpDocumentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentBackend {
    /// 创建新的后端客户端
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

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/documents/{}", self.base_url, document_id)
    }

    async fn create_impl(&self, document: &Document) -> AppResult<String> {
        let url = format!("{}/documents", self.base_url);
        debug!("创建文档: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| AppError::persistence("create", e))?;

        let response = check_status("create", response).await?;
        let body: CreateResponse = response.json().await.map_err(|e| {
            AppError::Persistence(PersistenceError::MalformedResponse {
                operation: "create".to_string(),
                message: e.to_string(),
            })
        })?;

        Ok(body.document_id)
    }

    async fn update_impl(&self, document_id: &str, document: &Document) -> AppResult<()> {
        let url = self.document_url(document_id);
        debug!("更新文档: PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| AppError::persistence("update", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(document_id));
        }
        check_status("update", response).await?;
        Ok(())
    }

    async fn get_impl(&self, document_id: &str) -> AppResult<Document> {
        let url = self.document_url(document_id);
        debug!("读取文档: GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::persistence("get", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(document_id));
        }
        let response = check_status("get", response).await?;
        response.json::<Document>().await.map_err(|e| {
            AppError::Persistence(PersistenceError::MalformedResponse {
                operation: "get".to_string(),
                message: e.to_string(),
            })
        })
    }
}

impl DocumentBackend for HttpDocumentBackend {
    fn create<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, AppResult<String>> {
        self.create_impl(document).boxed()
    }

    fn update<'a>(&'a self, document_id: &'a str, document: &'a Document) -> BoxFuture<'a, AppResult<()>> {
        self.update_impl(document_id, document).boxed()
    }

    fn get<'a>(&'a self, document_id: &'a str) -> BoxFuture<'a, AppResult<Document>> {
        self.get_impl(document_id).boxed()
    }
}

/// 非 2xx 响应统一转换为 `BadResponse`
pub(crate) async fn check_status(
    operation: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(AppError::bad_response(operation, status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpDocumentBackend::new("http://localhost:9000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.document_url("abc"), "http://localhost:9000/documents/abc");
    }
}
