//! Response envelope types.
//!
//! Items serialize as `{id, type, attributes}` resources; failures as
//! an `{errors: [{code, title}]}` document. Codes are the stable
//! strings from [`StorageError::code`], titles the human messages.

use serde::Serialize;

use crate::error::StorageError;
use crate::item::ItemSnapshot;
use crate::policy::PolicyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Folder,
    Initiate,
}

/// One item as a response resource. The id is the relative path.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub attributes: ItemSnapshot,
}

impl From<ItemSnapshot> for ItemResource {
    fn from(snapshot: ItemSnapshot) -> Self {
        let kind = if snapshot.is_directory {
            ResourceKind::Folder
        } else {
            ResourceKind::File
        };
        Self {
            id: snapshot.path_relative.clone(),
            kind,
            attributes: snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ApiError>,
}

impl From<&StorageError> for ErrorResponse {
    fn from(err: &StorageError) -> Self {
        Self {
            errors: vec![ApiError {
                code: err.code().to_string(),
                title: err.to_string(),
            }],
        }
    }
}

/// Handshake resource: the slice of server configuration a client
/// needs before issuing requests.
#[derive(Debug, Clone, Serialize)]
pub struct InitiateResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub attributes: InitiateAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiateAttributes {
    pub config: SharedConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedConfig {
    pub security: SharedSecurity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSecurity {
    pub read_only: bool,
    pub extensions: PolicyConfig,
}
