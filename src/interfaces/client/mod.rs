use crate::domain::dataset::{DatasetDetail, DatasetOverview};
use crate::domain::error::{AppError, Result};
use crate::domain::user::AuthSession;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use url::Url;

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

/// HTTP client for the equipment API, as used by desktop front ends
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8000`
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::ValidationError(format!("Invalid API URL: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("API error ({}): {}", status, text));
        Err(error_for_status(status, message))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse JSON: {}", e)))
    }

    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<DatasetDetail> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().part("file", part);

        let url = self.endpoint("api/upload/")?;
        self.json(self.client.post(url).multipart(form)).await
    }

    pub async fn upload_file(&self, path: &Path) -> Result<DatasetDetail> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.csv");
        self.upload(filename, bytes).await
    }

    pub async fn summary(&self, id: i64) -> Result<DatasetOverview> {
        let url = self.endpoint(&format!("api/summary/{}/", id))?;
        self.json(self.client.get(url)).await
    }

    pub async fn detail(&self, id: i64) -> Result<DatasetDetail> {
        let url = self.endpoint(&format!("api/data/{}/", id))?;
        self.json(self.client.get(url)).await
    }

    pub async fn history(&self) -> Result<Vec<DatasetOverview>> {
        let url = self.endpoint("api/history/")?;
        self.json(self.client.get(url)).await
    }

    /// Returns the server's confirmation message
    pub async fn delete(&self, id: i64) -> Result<String> {
        let url = self.endpoint(&format!("api/dataset/{}/", id))?;
        let body: MessageResponse = self.json(self.client.delete(url)).await?;
        Ok(body.message)
    }

    /// PDF bytes of the dataset report
    pub async fn report(&self, id: i64) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("api/report/{}/", id))?;
        let response = self.send(self.client.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read report: {}", e)))?;
        Ok(bytes.to_vec())
    }

    pub async fn register(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<AuthSession> {
        let url = self.endpoint("api/auth/register/")?;
        let body = json!({ "username": username, "email": email, "password": password });
        self.json(self.client.post(url).json(&body)).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let url = self.endpoint("api/auth/login/")?;
        let body = json!({ "username": username, "password": password });
        self.json(self.client.post(url).json(&body)).await
    }

    pub async fn logout(&self) -> Result<()> {
        let url = self.endpoint("api/auth/logout/")?;
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

fn error_for_status(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::ValidationError(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Internal(message),
    }
}
