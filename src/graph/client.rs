//! Microsoft Graph client for directory lookups and application owners.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{display_name_filter, DirectoryObject, ODataList, ODataReference};
use super::retry::{send_with_retry, RetryOn, RetryPolicy};
use crate::config::Config;
use crate::error::ApiError;

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    retry: RetryPolicy,
    http_client: Client,
}

impl GraphClient {
    /// Create a new Graph client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_http_client(
            http_client,
            &config.api.graph_base_url,
            config.retry_policy(),
        ))
    }

    pub fn with_http_client(http_client: Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            http_client,
        }
    }

    /// Look up a group's object ID by exact display name.
    pub async fn find_group_id(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<Option<String>, ApiError> {
        self.find_id_by_display_name(access_token, "groups", display_name)
            .await
    }

    /// Look up an application's object ID by exact display name.
    pub async fn find_application_id(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<Option<String>, ApiError> {
        self.find_id_by_display_name(access_token, "applications", display_name)
            .await
    }

    /// Return the first object in `collection` whose display name matches.
    async fn find_id_by_display_name(
        &self,
        access_token: &str,
        collection: &str,
        display_name: &str,
    ) -> Result<Option<String>, ApiError> {
        let url = format!("{}/{}", self.base_url, collection);
        let filter = display_name_filter(display_name);

        debug!("Fetching {} with filter {}", collection, filter);

        let list: ODataList<DirectoryObject> = self
            .get_json(access_token, collection, || {
                self.http_client
                    .get(&url)
                    .query(&[("$filter", filter.as_str()), ("$select", "id,displayName")])
            })
            .await?;

        if list.value.len() > 1 {
            warn!(
                "{} objects in {} share display name '{}'; using the first",
                list.value.len(),
                collection,
                display_name
            );
        }

        Ok(list.value.into_iter().next().map(|object| object.id))
    }

    /// Fetch the current owners of an application.
    pub async fn list_application_owners(
        &self,
        access_token: &str,
        app_id: &str,
    ) -> Result<Vec<DirectoryObject>, ApiError> {
        let url = format!("{}/applications/{}/owners", self.base_url, app_id);

        let list: ODataList<DirectoryObject> = self
            .get_json(access_token, "owners", || self.http_client.get(&url))
            .await?;

        debug!("Application {} has {} owners", app_id, list.value.len());
        for owner in &list.value {
            debug!(
                id = %owner.id,
                kind = owner.odata_type.as_deref().unwrap_or("unknown"),
                name = owner.display_name.as_deref().unwrap_or(""),
                "Owner"
            );
        }
        Ok(list.value)
    }

    /// Check whether `group_id` is already an owner of the application.
    pub async fn is_owner(
        &self,
        access_token: &str,
        app_id: &str,
        group_id: &str,
    ) -> Result<bool, ApiError> {
        let owners = self.list_application_owners(access_token, app_id).await?;
        Ok(owners.iter().any(|owner| owner.id == group_id))
    }

    /// Add `group_id` as an owner of the application.
    ///
    /// Returns `true` only when Graph answers `204 No Content`. The write is
    /// repeated only when Graph throttled it or the connection never opened;
    /// a repeat of an applied `$ref` POST is rejected with 400.
    pub async fn add_owner(
        &self,
        access_token: &str,
        app_id: &str,
        group_id: &str,
    ) -> Result<bool, ApiError> {
        let url = format!("{}/applications/{}/owners/$ref", self.base_url, app_id);
        let body = ODataReference::directory_object(&self.base_url, group_id);

        let response = self
            .send(access_token, "add_owner", RetryOn::Unprocessed, || {
                self.http_client.post(&url).json(&body)
            })
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            info!("Added {} as owner of application {}", group_id, app_id);
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Adding owner failed: HTTP {} - {}", status, body);
        Ok(false)
    }

    async fn send<F>(
        &self,
        access_token: &str,
        operation: &str,
        retry_on: RetryOn,
        build: F,
    ) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = send_with_retry(&self.retry, retry_on, operation, || {
            build()
                .bearer_auth(access_token)
                .header("Accept", "application/json")
                .header("client-request-id", Uuid::new_v4().to_string())
        })
        .await?;

        Ok(response)
    }

    async fn get_json<T, F>(
        &self,
        access_token: &str,
        operation: &str,
        build: F,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let response = self
            .send(access_token, operation, RetryOn::Transient, build)
            .await?;

        let status = response.status();
        match status.as_u16() {
            200 => response
                .json::<T>()
                .await
                .map_err(|e| ApiError::ParseFailed(e.to_string())),
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            404 => Err(ApiError::NotFound),
            429 => Err(ApiError::RateLimited),
            _ => {
                // Don't expose raw API error details - just log them
                let body = response.text().await.unwrap_or_default();
                error!("Graph {} failed: HTTP {} - {}", operation, status, body);
                Err(ApiError::GraphRequestFailed(format!("HTTP {}", status.as_u16())))
            }
        }
    }
}
