//! Platform client: the three HTTP calls a post needs.
//!
//! The [`Platform`] trait is the seam between the pipeline and the network.
//! [`HttpPlatform`] talks to the LinkedIn v2 REST API with `reqwest`; tests
//! substitute a recording double.
//!
//! | Call | Endpoint | Used by |
//! |---|---|---|
//! | register upload | `POST {base}/assets?action=registerUpload` | [`upload`](crate::upload) |
//! | binary upload | `PUT <uploadUrl>` | [`upload`](crate::upload) |
//! | create post | `POST {base}/ugcPosts` | [`publish`](crate::publish) |
//!
//! JSON calls carry the bearer token, `Content-Type: application/json` and
//! `X-Restli-Protocol-Version`. The binary upload carries the bearer token and
//! the image's content type. Every call has its own timeout; nothing retries.

use crate::config::{Credentials, PlatformConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upload mechanism key the registration response is expected to carry.
pub const UPLOAD_MECHANISM: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";
const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";
const UGC_RELATIONSHIP: &str = "urn:li:userGeneratedContent";
const RESTLI_ID_HEADER: &str = "x-restli-id";

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Platform-issued identifier of an uploaded image, e.g.
/// `urn:li:digitalmediaAsset:C5522AQ...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(String);

impl AssetHandle {
    pub fn new(urn: impl Into<String>) -> Self {
        Self(urn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful registration: where to PUT the bytes, and the
/// handle the post will reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub upload_url: String,
    pub asset: AssetHandle,
}

/// Platform response to a created post.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPost {
    pub id: Option<String>,
    /// Raw response body; `Null` when empty, a string when not JSON.
    pub body: serde_json::Value,
}

/// The platform operations the pipeline depends on.
pub trait Platform {
    /// Identity that owns uploaded assets and authors posts.
    fn owner(&self) -> &str;

    /// Declare an upcoming image upload.
    fn register_upload(&self) -> impl Future<Output = Result<UploadTicket, PlatformError>> + Send;

    /// Transfer raw image bytes to a registered upload URL.
    fn upload(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Submit a post.
    fn create_post(
        &self,
        post: &UgcPost,
    ) -> impl Future<Output = Result<CreatedPost, PlatformError>> + Send;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUploadBody<'a> {
    register_upload_request: RegisterUploadRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUploadRequest<'a> {
    recipes: [&'a str; 1],
    owner: &'a str,
    service_relationships: [ServiceRelationship<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRelationship<'a> {
    relationship_type: &'a str,
    identifier: &'a str,
}

fn register_upload_body(owner: &str) -> RegisterUploadBody<'_> {
    RegisterUploadBody {
        register_upload_request: RegisterUploadRequest {
            recipes: [FEEDSHARE_IMAGE_RECIPE],
            owner,
            service_relationships: [ServiceRelationship {
                relationship_type: "OWNER",
                identifier: UGC_RELATIONSHIP,
            }],
        },
    }
}

/// A user-generated-content post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UgcPost {
    pub author: String,
    pub lifecycle_state: LifecycleState,
    pub specific_content: SpecificContent,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    pub share_content: ShareContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContent {
    pub share_commentary: TextValue,
    pub share_media_category: MediaCategory,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaCategory {
    None,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareMedia {
    pub status: MediaStatus,
    pub description: TextValue,
    pub media: AssetHandle,
    pub title: TextValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaStatus {
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextValue {
    pub text: String,
}

impl TextValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    pub member_network: NetworkVisibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkVisibility {
    Public,
}

/// Extract the upload URL and asset from a registration response.
///
/// Expected shape:
/// `{ "value": { "uploadMechanism": { "<key>": { "uploadUrl": ... } }, "asset": ... } }`.
/// The well-known [`UPLOAD_MECHANISM`] key is preferred; otherwise the first
/// mechanism carrying an `uploadUrl` is used.
pub fn parse_upload_ticket(body: &serde_json::Value) -> Result<UploadTicket, PlatformError> {
    let value = body
        .get("value")
        .ok_or_else(|| PlatformError::Malformed("missing 'value'".into()))?;
    let asset = value
        .get("asset")
        .and_then(|a| a.as_str())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| PlatformError::Malformed("missing 'value.asset'".into()))?;
    let mechanisms = value
        .get("uploadMechanism")
        .and_then(|m| m.as_object())
        .ok_or_else(|| PlatformError::Malformed("missing 'value.uploadMechanism'".into()))?;

    let url_of = |m: &serde_json::Value| {
        m.get("uploadUrl")
            .and_then(|u| u.as_str())
            .filter(|u| !u.is_empty())
            .map(String::from)
    };
    let upload_url = mechanisms
        .get(UPLOAD_MECHANISM)
        .and_then(url_of)
        .or_else(|| mechanisms.values().find_map(url_of))
        .ok_or_else(|| PlatformError::Malformed("no upload mechanism with an 'uploadUrl'".into()))?;

    Ok(UploadTicket {
        upload_url,
        asset: AssetHandle::new(asset),
    })
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// [`Platform`] over HTTPS with `reqwest`.
pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    owner_urn: String,
    protocol_version: String,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl HttpPlatform {
    pub fn new(config: &PlatformConfig, credentials: &Credentials) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("weekly-post/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: credentials.access_token.clone(),
            owner_urn: credentials.owner_urn.clone(),
            protocol_version: config.protocol_version.clone(),
            request_timeout: config.request_timeout(),
            upload_timeout: config.upload_timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, PlatformError> {
        debug!(url, "POST");
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", &self.protocol_version)
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await?;
        ensure_success(resp).await
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PlatformError::Status {
        status: status.as_u16(),
        body,
    })
}

impl Platform for HttpPlatform {
    fn owner(&self) -> &str {
        &self.owner_urn
    }

    async fn register_upload(&self) -> Result<UploadTicket, PlatformError> {
        let url = self.endpoint("assets?action=registerUpload");
        let resp = self.post_json(&url, &register_upload_body(&self.owner_urn)).await?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PlatformError::Malformed(e.to_string()))?;
        let ticket = parse_upload_ticket(&body)?;
        debug!(asset = %ticket.asset, "upload registered");
        Ok(ticket)
    }

    async fn upload(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), PlatformError> {
        debug!(url = upload_url, content_type, size = bytes.len(), "PUT");
        let resp = self
            .client
            .put(upload_url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .timeout(self.upload_timeout)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn create_post(&self, post: &UgcPost) -> Result<CreatedPost, PlatformError> {
        let url = self.endpoint("ugcPosts");
        let resp = self.post_json(&url, post).await?;
        let header_id = resp
            .headers()
            .get(RESTLI_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        // The post is live once the status is a success; the body can only
        // contribute an id.
        let text = resp.text().await.unwrap_or_default();
        Ok(created_post_from(&text, header_id))
    }
}

/// Interpret a successful post-creation response.
///
/// Never fails: an empty body is `Null`, a non-JSON body is kept as a string.
/// The id comes from the body's `id`, else from the `x-restli-id` header.
pub fn created_post_from(text: &str, header_id: Option<String>) -> CreatedPost {
    let body = if text.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
    };
    let id = body
        .get("id")
        .and_then(|i| i.as_str())
        .map(String::from)
        .or(header_id);
    CreatedPost { id, body }
}
