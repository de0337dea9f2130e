use crate::domain::models::ActivityId;
use crate::infrastructure::activity_mapper::{
    ActivityRecord, ActivityTypeRecord, PlacementUpdateRecord,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

const ACTIVITIES_SEGMENT: &str = "activities";
const ACTIVITY_TYPES_SEGMENT: &str = "activity-types";

#[async_trait]
pub trait ActivityBackend: Send + Sync {
    async fn list_activities(&self) -> Result<Vec<ActivityRecord>, InfraError>;

    async fn list_activity_types(&self) -> Result<Vec<ActivityTypeRecord>, InfraError>;

    async fn update_placement(
        &self,
        activity_id: ActivityId,
        update: &PlacementUpdateRecord,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestActivityBackend {
    client: Client,
    base_url: Url,
}

impl ReqwestActivityBackend {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(InfraError::InvalidConfig(
                "api base url must not be empty".to_string(),
            ));
        }
        let base_url = Url::parse(trimmed)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid api base url: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "api base url cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("activity api error: http {}", status.as_u16())
        } else {
            format!("activity api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Http(message)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("api base url cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, InfraError> {
        let response = self.client.get(url).send().await.map_err(|error| {
            InfraError::Http(format!("network error while listing {what}: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Http(format!("failed reading {what} response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Http(format!("invalid {what} payload: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl ActivityBackend for ReqwestActivityBackend {
    async fn list_activities(&self) -> Result<Vec<ActivityRecord>, InfraError> {
        let url = self.endpoint(&[ACTIVITIES_SEGMENT])?;
        self.get_json(url, "activities").await
    }

    async fn list_activity_types(&self) -> Result<Vec<ActivityTypeRecord>, InfraError> {
        let url = self.endpoint(&[ACTIVITY_TYPES_SEGMENT])?;
        self.get_json(url, "activity types").await
    }

    async fn update_placement(
        &self,
        activity_id: ActivityId,
        update: &PlacementUpdateRecord,
    ) -> Result<(), InfraError> {
        let id = activity_id.to_string();
        let url = self.endpoint(&[ACTIVITIES_SEGMENT, id.as_str()])?;
        let response = self
            .client
            .patch(url)
            .json(update)
            .send()
            .await
            .map_err(|error| {
                InfraError::Http(format!(
                    "network error while updating activity {activity_id}: {error}"
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Http(format!("failed reading activity update response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }
        Ok(())
    }
}
