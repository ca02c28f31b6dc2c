//! The owner workflow: token, group, application, owner check, write.

use std::fmt;

use tracing::{debug, info, warn};

use crate::auth::oauth::{Credentials, TokenClient};
use crate::config::TargetConfig;
use crate::error::AppError;
use crate::graph::GraphClient;

/// Which display-name lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Group,
    Application,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("group"),
            Self::Application => f.write_str("application"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound(Lookup),
    AlreadyAssigned,
    Added,
    AddFailed,
    /// Dry run stopped before the write.
    WouldAdd,
}

impl Outcome {
    /// The line printed to stdout for this outcome.
    pub fn message(&self, target: &TargetConfig) -> String {
        match self {
            Self::NotFound(_) => "Could not find group or application".to_string(),
            Self::AlreadyAssigned => format!(
                "Group '{}' is already assigned to application '{}'",
                target.group_name, target.app_name
            ),
            Self::Added => format!(
                "Successfully added group '{}' to application '{}'",
                target.group_name, target.app_name
            ),
            Self::AddFailed => "Failed to add group to application".to_string(),
            Self::WouldAdd => format!(
                "Dry run: would add group '{}' to application '{}'",
                target.group_name, target.app_name
            ),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AlreadyAssigned | Self::Added | Self::WouldAdd => 0,
            Self::NotFound(_) | Self::AddFailed => 1,
        }
    }
}

/// Ensure the target group is an owner of the target application.
pub async fn run(
    tokens: &TokenClient,
    graph: &GraphClient,
    credentials: &Credentials,
    target: &TargetConfig,
    dry_run: bool,
) -> Result<Outcome, AppError> {
    let access_token = tokens.acquire_token(credentials).await?;
    let token = access_token.as_str();
    debug!(
        "Using {} token valid until {}",
        access_token.token_type, access_token.expires_at
    );

    let Some(group_id) = graph.find_group_id(token, &target.group_name).await? else {
        warn!("No {} with display name '{}'", Lookup::Group, target.group_name);
        return Ok(Outcome::NotFound(Lookup::Group));
    };

    let Some(app_id) = graph.find_application_id(token, &target.app_name).await? else {
        warn!("No {} with display name '{}'", Lookup::Application, target.app_name);
        return Ok(Outcome::NotFound(Lookup::Application));
    };

    info!("Resolved group {} and application {}", group_id, app_id);

    if graph.is_owner(token, &app_id, &group_id).await? {
        return Ok(Outcome::AlreadyAssigned);
    }

    if dry_run {
        info!("Dry run, skipping owner write");
        return Ok(Outcome::WouldAdd);
    }

    if graph.add_owner(token, &app_id, &group_id).await? {
        Ok(Outcome::Added)
    } else {
        Ok(Outcome::AddFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::secure::SecureString;
    use crate::error::AuthError;
    use crate::graph::retry::RetryPolicy;
    use httpmock::prelude::*;
    use httpmock::Mock;
    use serde_json::json;

    fn target() -> TargetConfig {
        TargetConfig {
            group_name: "Platform Admins".into(),
            app_name: "billing-api".into(),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            tenant_id: "contoso".into(),
            client_id: "client-123".into(),
            client_secret: SecureString::from("s3cret"),
        }
    }

    fn clients(server: &MockServer) -> (TokenClient, GraphClient) {
        let tokens = TokenClient::with_http_client(
            reqwest::Client::new(),
            &server.url("/login"),
            "https://graph.microsoft.com/.default",
            RetryPolicy::none(),
        );
        let graph = GraphClient::with_http_client(
            reqwest::Client::new(),
            &server.url("/v1.0"),
            RetryPolicy::none(),
        );
        (tokens, graph)
    }

    async fn mock_token(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login/contoso/oauth2/v2.0/token");
                then.status(200).json_body(json!({
                    "token_type": "Bearer",
                    "expires_in": 3599,
                    "access_token": "tok"
                }));
            })
            .await;
    }

    async fn mock_lookup<'a>(server: &'a MockServer, collection: &str, ids: &[&str]) -> Mock<'a> {
        let path = format!("/v1.0/{}", collection);
        let value: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
        server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).json_body(json!({ "value": value }));
            })
            .await
    }

    async fn mock_owners(server: &MockServer, ids: &[&str]) {
        let value: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1.0/applications/app-1/owners");
                then.status(200).json_body(json!({ "value": value }));
            })
            .await;
    }

    async fn mock_add_owner(server: &MockServer, status: u16) -> Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1.0/applications/app-1/owners/$ref")
                    .header("authorization", "Bearer tok");
                then.status(status);
            })
            .await
    }

    #[tokio::test]
    async fn test_already_assigned_skips_write() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &["g-1"]).await;
        mock_lookup(&server, "applications", &["app-1"]).await;
        mock_owners(&server, &["u-7", "g-1"]).await;
        let write = mock_add_owner(&server, 204).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), false)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::AlreadyAssigned);
        assert_eq!(
            outcome.message(&target()),
            "Group 'Platform Admins' is already assigned to application 'billing-api'"
        );
        write.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_adds_missing_owner() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &["g-1"]).await;
        mock_lookup(&server, "applications", &["app-1"]).await;
        mock_owners(&server, &["u-7"]).await;
        let write = mock_add_owner(&server, 204).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), false)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Added);
        assert_eq!(
            outcome.message(&target()),
            "Successfully added group 'Platform Admins' to application 'billing-api'"
        );
        assert_eq!(outcome.exit_code(), 0);
        write.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_missing_group_stops_early() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &[]).await;
        let apps = mock_lookup(&server, "applications", &["app-1"]).await;
        let write = mock_add_owner(&server, 204).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), false)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NotFound(Lookup::Group));
        assert_eq!(outcome.message(&target()), "Could not find group or application");
        assert_eq!(outcome.exit_code(), 1);
        apps.assert_hits_async(0).await;
        write.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_missing_application() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &["g-1"]).await;
        mock_lookup(&server, "applications", &[]).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), false)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NotFound(Lookup::Application));
        assert_eq!(outcome.message(&target()), "Could not find group or application");
    }

    #[tokio::test]
    async fn test_write_rejected() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &["g-1"]).await;
        mock_lookup(&server, "applications", &["app-1"]).await;
        mock_owners(&server, &[]).await;
        mock_add_owner(&server, 400).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), false)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::AddFailed);
        assert_eq!(outcome.message(&target()), "Failed to add group to application");
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        mock_lookup(&server, "groups", &["g-1"]).await;
        mock_lookup(&server, "applications", &["app-1"]).await;
        mock_owners(&server, &[]).await;
        let write = mock_add_owner(&server, 204).await;

        let (tokens, graph) = clients(&server);
        let outcome = run(&tokens, &graph, &credentials(), &target(), true)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::WouldAdd);
        assert_eq!(
            outcome.message(&target()),
            "Dry run: would add group 'Platform Admins' to application 'billing-api'"
        );
        write.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_auth_failure_aborts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login/contoso/oauth2/v2.0/token");
                then.status(401);
            })
            .await;
        let groups = mock_lookup(&server, "groups", &["g-1"]).await;

        let (tokens, graph) = clients(&server);
        let result = run(&tokens, &graph, &credentials(), &target(), false).await;

        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));
        groups.assert_hits_async(0).await;
    }
}
