//! REST gateway
//!
//! JSON-over-HTTP backend:
//!
//! | Call | Request |
//! |---|---|
//! | create program | `POST /programs` |
//! | create activity | `POST /programs/{id}/activities` |
//! | create task | `POST /activities/{id}/tasks` |
//! | hydrate | `GET /programs/{id}?expand=activities.tasks` |
//! | delete | `DELETE /programs/{id}`, `/activities/{id}`, `/tasks/{id}` |
//!
//! Create calls answer `{"id": "<uuid>"}`.

use crate::error::GatewayError;
use crate::Gateway;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wp_model::{
    ActivityDraft, ActivityId, EntityKind, ProgramDraft, ProgramId, ProvisionedTree, TaskDraft,
    TaskId,
};

/// REST gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestGatewayConfig {
    /// Base URL, e.g. `https://api.example.org/v1`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
}

impl RestGatewayConfig {
    /// Create configuration for a base URL
    #[inline]
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for RestGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            api_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

/// HTTP backend
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl RestGateway {
    /// Create a gateway
    ///
    /// # Errors
    /// Returns [`GatewayError::Unavailable`] if the HTTP client cannot be built
    pub fn new(config: RestGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        entity: EntityKind,
        id: Option<String>,
        builder: RequestBuilder,
    ) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, %entity, body = %body, "gateway request failed");
        Err(classify(status, entity, id, body))
    }

    async fn create<B: Serialize + ?Sized>(
        &self,
        entity: EntityKind,
        path: &str,
        body: &B,
    ) -> Result<uuid::Uuid, GatewayError> {
        let response = self
            .send(entity, None, self.request(Method::POST, path).json(body))
            .await?;
        let created: Created = decode(response).await?;
        uuid::Uuid::parse_str(&created.id).map_err(|e| GatewayError::Decode {
            reason: format!("{entity} id '{}': {e}", created.id),
        })
    }

    async fn delete(&self, entity: EntityKind, path: &str, id: String) -> Result<(), GatewayError> {
        self.send(entity, Some(id), self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_decode() {
        GatewayError::Decode {
            reason: error.to_string(),
        }
    } else {
        GatewayError::unavailable(error.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode {
        reason: e.to_string(),
    })
}

/// Map a non-success status to a gateway error
fn classify(status: StatusCode, entity: EntityKind, id: Option<String>, body: String) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound {
            entity,
            id: id.unwrap_or_default(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::unavailable(format!("{status}: {body}"))
        }
        s if s.is_server_error() => GatewayError::unavailable(format!("{status}: {body}")),
        _ => GatewayError::rejected(entity, format!("{status}: {body}")),
    }
}

#[async_trait::async_trait]
impl Gateway for RestGateway {
    #[tracing::instrument(skip_all, fields(program = %draft.name))]
    async fn create_program(&self, draft: &ProgramDraft) -> Result<ProgramId, GatewayError> {
        self.create(EntityKind::Program, "/programs", draft)
            .await
            .map(ProgramId)
    }

    #[tracing::instrument(skip_all, fields(%program_id, activity = %draft.name))]
    async fn create_activity(
        &self,
        program_id: ProgramId,
        draft: &ActivityDraft,
    ) -> Result<ActivityId, GatewayError> {
        let path = format!("/programs/{program_id}/activities");
        self.create(EntityKind::Activity, &path, draft)
            .await
            .map(ActivityId)
    }

    #[tracing::instrument(skip_all, fields(%activity_id, task = %draft.name))]
    async fn create_task(
        &self,
        activity_id: ActivityId,
        draft: &TaskDraft,
    ) -> Result<TaskId, GatewayError> {
        let path = format!("/activities/{activity_id}/tasks");
        self.create(EntityKind::Task, &path, draft).await.map(TaskId)
    }

    #[tracing::instrument(skip(self))]
    async fn read_program_with_children(
        &self,
        program_id: ProgramId,
    ) -> Result<ProvisionedTree, GatewayError> {
        let builder = self
            .request(Method::GET, &format!("/programs/{program_id}"))
            .query(&[("expand", "activities.tasks")]);
        let response = self
            .send(EntityKind::Program, Some(program_id.to_string()), builder)
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_program(&self, program_id: ProgramId) -> Result<(), GatewayError> {
        self.delete(
            EntityKind::Program,
            &format!("/programs/{program_id}"),
            program_id.to_string(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_activity(&self, activity_id: ActivityId) -> Result<(), GatewayError> {
        self.delete(
            EntityKind::Activity,
            &format!("/activities/{activity_id}"),
            activity_id.to_string(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, task_id: TaskId) -> Result<(), GatewayError> {
        self.delete(EntityKind::Task, &format!("/tasks/{task_id}"), task_id.to_string())
            .await
    }
}
