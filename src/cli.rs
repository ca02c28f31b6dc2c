//! Command-line interface.

use clap::Parser;

/// Ensure an Entra ID group is an owner of an application registration.
#[derive(Debug, Default, Parser)]
#[command(name = "azure-app-owner")]
#[command(about = "Add a group as owner of an application via Microsoft Graph", version)]
pub struct Cli {
    /// Directory (tenant) ID
    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Application (client) ID of the app registration used to sign in
    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret of the app registration used to sign in
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Display name of the group to add as owner
    #[arg(long = "group", env = "AZURE_GROUP_NAME")]
    pub group_name: Option<String>,

    /// Display name of the target application
    #[arg(long = "app", env = "AZURE_APP_NAME")]
    pub app_name: Option<String>,

    /// Resolve and check only, never write
    #[arg(long)]
    pub dry_run: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum attempts per request for transient failures
    #[arg(long)]
    pub max_attempts: Option<u32>,
}
