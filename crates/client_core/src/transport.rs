//! REST calls against the student backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{RollId, Student},
    error::ApiError,
    protocol::{
        student_route, students_route, CreateStudentRequest, ListStudentsResponse,
        UpdateStudentRequest,
    },
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ClientSettings;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("backend rejected request with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("malformed backend response: {0}")]
    Decode(String),
    #[error("invalid backend url '{0}'")]
    InvalidUrl(String),
}

impl BackendError {
    /// The backend's own `{ "error": ... }` message, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait StudentBackend: Send + Sync {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError>;
    async fn create_student(&self, request: &CreateStudentRequest) -> Result<(), BackendError>;
    async fn update_student(
        &self,
        roll: &RollId,
        request: &UpdateStudentRequest,
    ) -> Result<(), BackendError>;
    async fn delete_student(&self, roll: &RollId) -> Result<(), BackendError>;
}

pub struct HttpStudentBackend {
    http: Client,
    base_url: Url,
}

impl HttpStudentBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Self::with_client(http, &settings.api_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(base_url).map_err(|_| BackendError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str, roll: Option<&RollId>) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(route.trim_start_matches('/').split('/'));
            if let Some(roll) = roll {
                segments.push(roll.as_str());
            }
        }
        Ok(url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ApiError>()
        .await
        .ok()
        .map(|body| body.error)
        .filter(|message| !message.trim().is_empty());
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl StudentBackend for HttpStudentBackend {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        let url = self.endpoint(students_route(), None)?;
        debug!(%url, "listing students");
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let body: ListStudentsResponse = response.json().await?;
        Ok(body.students)
    }

    async fn create_student(&self, request: &CreateStudentRequest) -> Result<(), BackendError> {
        let url = self.endpoint(student_route(), None)?;
        debug!(%url, roll = %request.roll, "creating student");
        ensure_success(self.http.post(url).json(request).send().await?).await?;
        Ok(())
    }

    async fn update_student(
        &self,
        roll: &RollId,
        request: &UpdateStudentRequest,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(student_route(), Some(roll))?;
        debug!(%url, %roll, "updating student");
        ensure_success(self.http.put(url).json(request).send().await?).await?;
        Ok(())
    }

    async fn delete_student(&self, roll: &RollId) -> Result<(), BackendError> {
        let url = self.endpoint(student_route(), Some(roll))?;
        debug!(%url, %roll, "deleting student");
        ensure_success(self.http.delete(url).send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
