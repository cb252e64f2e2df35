//! reqwest implementation of the attendance backend contract

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{ClientConfig, ClientError, ClientResult, RejectionBody};
use crate::attendance::session::AttendanceBackend;
use crate::model::attendance::{AttendanceRecord, CreateAttendance};
use crate::model::work_zone::WorkZone;

/// Paginated envelope used by the list endpoints.
#[derive(Debug, serde::Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct HttpAttendanceBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAttendanceBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.api_prefix.trim_matches('/')
            ),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => request.bearer_auth(t),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await?;
        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            s if s.is_client_error() => {
                let body = serde_json::from_str::<RejectionBody>(&text).unwrap_or(RejectionBody {
                    code: None,
                    message: text,
                });
                Err(ClientError::Rejected {
                    status: s.as_u16(),
                    code: body.code,
                    message: body.message,
                })
            }
            s => Err(ClientError::Server {
                status: s.as_u16(),
                message: text,
            }),
        }
    }
}

#[async_trait]
impl AttendanceBackend for HttpAttendanceBackend {
    async fn list_records(&self, since: NaiveDate) -> ClientResult<Vec<AttendanceRecord>> {
        let request = self
            .client
            .get(self.url("attendance"))
            .query(&[("date_after", since.to_string()), ("per_page", "100".to_string())]);
        let response = self.authorized(request).send().await?;
        let page: Page<AttendanceRecord> = Self::handle_response(response).await?;
        Ok(page.data)
    }

    async fn list_zones(&self) -> ClientResult<Vec<WorkZone>> {
        let request = self.client.get(self.url("zones"));
        let response = self.authorized(request).send().await?;
        let page: Page<WorkZone> = Self::handle_response(response).await?;
        Ok(page.data)
    }

    async fn create_record(&self, body: &CreateAttendance) -> ClientResult<AttendanceRecord> {
        let request = self.client.post(self.url("attendance")).json(body);
        let response = self.authorized(request).send().await?;
        Self::handle_response(response).await
    }
}
