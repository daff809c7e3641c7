//! Remote service integration
//!
//! This module provides:
//! - Form body encoding for the device-login endpoint
//! - The credential exchange client
//! - The HTTP transport seam
//! - Wire types for the notes changes endpoint

mod auth;
pub mod form;
mod transport;

pub use auth::{AuthClient, AuthError, AuthRequest, parse_auth_response};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ScriptedTransport, TransportError, UreqTransport,
};

/// Notes changes endpoint wire types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Platform reported in every request header
    pub const CLIENT_PLATFORM: &str = "ANDROID";

    /// Capability codes the service expects a full client to announce
    pub const CAPABILITIES: [&str; 11] = [
        "NC", "PI", "LB", "AN", "SH", "DR", "TR", "IN", "SNB", "MI", "CO",
    ];

    /// Body of a POST to the changes endpoint
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ChangesRequest {
        /// Local modifications; always empty because sync is read-only
        pub nodes: Vec<RawNode>,
        pub client_timestamp: String,
        pub request_header: RequestHeader,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub target_version: Option<String>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestHeader {
        pub client_session_id: String,
        pub client_platform: String,
        pub client_version: ClientVersion,
        pub capabilities: Vec<Capability>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct ClientVersion {
        pub major: String,
        pub minor: String,
        pub build: String,
        pub revision: String,
    }

    impl Default for ClientVersion {
        fn default() -> Self {
            Self {
                major: "9".to_string(),
                minor: "9".to_string(),
                build: "9".to_string(),
                revision: "9".to_string(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct Capability {
        #[serde(rename = "type")]
        pub kind: String,
    }

    impl Capability {
        /// The fixed capability list
        pub fn all() -> Vec<Self> {
            CAPABILITIES
                .iter()
                .map(|kind| Self {
                    kind: (*kind).to_string(),
                })
                .collect()
        }
    }

    /// One page of the changes feed
    ///
    /// The service has used two pagination styles over time: `toVersion` +
    /// `truncated`, and `nextPageToken`. Either, both or neither may show up.
    ///
    /// `nodes` stays untyped so one record that does not fit [`RawNode`]
    /// only costs that record, not the page.
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ChangesResponse {
        pub nodes: Option<Vec<serde_json::Value>>,
        pub to_version: Option<String>,
        pub truncated: Option<bool>,
        pub next_page_token: Option<String>,
    }

    /// A note, list item or other record from the feed
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawNode {
        pub id: String,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub parent_id: Option<String>,
        pub title: Option<String>,
        pub text: Option<String>,
        pub is_archived: Option<bool>,
        pub color: Option<String>,
        pub checked: Option<bool>,
        pub timestamps: Option<NodeTimestamps>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NodeTimestamps {
        pub created: Option<String>,
        pub updated: Option<String>,
        pub trashed: Option<String>,
        pub user_edited: Option<String>,
    }
}
