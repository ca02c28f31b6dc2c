//! Microsoft Graph payloads used by the owner workflow.

use serde::{Deserialize, Serialize};

/// Collection wrapper returned by Graph list endpoints.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A group, application or any other directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    /// Object ID.
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// e.g. `#microsoft.graph.group`
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
}

/// Body of a `POST .../$ref` request.
#[derive(Debug, Serialize)]
pub struct ODataReference {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

impl ODataReference {
    /// Reference to a directory object under the given Graph base URL.
    pub fn directory_object(graph_base_url: &str, object_id: &str) -> Self {
        Self {
            odata_id: format!(
                "{}/directoryObjects/{}",
                graph_base_url.trim_end_matches('/'),
                object_id
            ),
        }
    }
}

/// Build an exact-match OData filter on `displayName`.
///
/// Single quotes are doubled as OData string literals require.
pub fn display_name_filter(name: &str) -> String {
    format!("displayName eq '{}'", name.replace('\'', "''"))
}
