//! Post construction and submission.
//!
//! [`build_post`] is pure: text, author and asset handles in, a [`UgcPost`]
//! out. [`publish`] sends it. A post with no handles is text-only
//! (`shareMediaCategory: NONE`, no `media` list); otherwise every handle is
//! attached in order under `IMAGE`.
//!
//! A created post without an id is still a success; the ledger records
//! `postId: null` for it.

use crate::api::{
    AssetHandle, LifecycleState, MediaCategory, MediaStatus, NetworkVisibility, Platform,
    PlatformError, ShareContent, ShareMedia, SpecificContent, TextValue, UgcPost, Visibility,
};
use crate::config::PostConfig;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("creating post failed: {0}")]
    Rejected(#[from] PlatformError),
}

/// Captions attached to every image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStyle {
    pub media_title: String,
    pub media_description: String,
}

impl Default for PostStyle {
    fn default() -> Self {
        Self::from(&PostConfig::default())
    }
}

impl From<&PostConfig> for PostStyle {
    fn from(config: &PostConfig) -> Self {
        Self {
            media_title: config.media_title.clone(),
            media_description: config.media_description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub remote_post_id: Option<String>,
    pub raw: serde_json::Value,
}

pub fn build_post(author: &str, text: &str, assets: &[AssetHandle], style: &PostStyle) -> UgcPost {
    let media: Vec<ShareMedia> = assets
        .iter()
        .map(|asset| ShareMedia {
            status: MediaStatus::Ready,
            description: TextValue::new(&style.media_description),
            media: asset.clone(),
            title: TextValue::new(&style.media_title),
        })
        .collect();
    let category = if media.is_empty() {
        MediaCategory::None
    } else {
        MediaCategory::Image
    };

    UgcPost {
        author: author.to_string(),
        lifecycle_state: LifecycleState::Published,
        specific_content: SpecificContent {
            share_content: ShareContent {
                share_commentary: TextValue::new(text),
                share_media_category: category,
                media,
            },
        },
        visibility: Visibility {
            member_network: NetworkVisibility::Public,
        },
    }
}

/// Create a public post authored by the platform's owner.
pub async fn publish<P: Platform>(
    platform: &P,
    text: &str,
    assets: &[AssetHandle],
    style: &PostStyle,
) -> Result<PublishResult, PublishError> {
    let post = build_post(platform.owner(), text, assets, style);
    let created = platform.create_post(&post).await?;
    info!(
        post_id = created.id.as_deref().unwrap_or("<none>"),
        images = assets.len(),
        "post created"
    );
    Ok(PublishResult {
        remote_post_id: created.id,
        raw: created.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockPlatform;
    use serde_json::json;

    fn handles(n: usize) -> Vec<AssetHandle> {
        (1..=n)
            .map(|i| AssetHandle::new(format!("urn:li:digitalmediaAsset:A{i}")))
            .collect()
    }

    // =========================================================================
    // build_post
    // =========================================================================

    #[test]
    fn image_post_wire_shape() {
        let post = build_post("urn:li:person:1", "Hello", &handles(2), &PostStyle::default());
        let media = |id: &str| {
            json!({
                "status": "READY",
                "description": { "text": "Auto uploaded image" },
                "media": id,
                "title": { "text": "Raspberry Pi Automation" }
            })
        };

        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            json!({
                "author": "urn:li:person:1",
                "lifecycleState": "PUBLISHED",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": { "text": "Hello" },
                        "shareMediaCategory": "IMAGE",
                        "media": [
                            media("urn:li:digitalmediaAsset:A1"),
                            media("urn:li:digitalmediaAsset:A2"),
                        ]
                    }
                },
                "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
            })
        );
    }

    #[test]
    fn text_only_post_has_no_media_list() {
        let post = build_post("urn:li:person:1", "Hello World", &[], &PostStyle::default());
        let value = serde_json::to_value(&post).unwrap();
        let share = &value["specificContent"]["com.linkedin.ugc.ShareContent"];

        assert_eq!(share["shareMediaCategory"], "NONE");
        assert_eq!(share["shareCommentary"]["text"], "Hello World");
        assert!(share.get("media").is_none());
    }

    #[test]
    fn custom_captions_applied_to_every_image() {
        let style = PostStyle {
            media_title: "Garden".into(),
            media_description: "Week photo".into(),
        };
        let post = build_post("urn:li:person:1", "x", &handles(3), &style);
        let media = &post.specific_content.share_content.media;
        assert_eq!(media.len(), 3);
        assert!(media.iter().all(|m| m.title.text == "Garden"));
        assert!(media.iter().all(|m| m.description.text == "Week photo"));
    }

    // =========================================================================
    // publish
    // =========================================================================

    #[tokio::test]
    async fn publish_uses_platform_owner_as_author() {
        let platform = MockPlatform::new();
        let result = publish(&platform, "Hi", &handles(1), &PostStyle::default())
            .await
            .unwrap();

        assert_eq!(result.remote_post_id.as_deref(), Some("urn:li:share:mock"));
        let posts = platform.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["author"], "urn:li:person:test");
    }

    #[tokio::test]
    async fn missing_post_id_is_not_an_error() {
        let platform = MockPlatform::new().without_post_id();
        let result = publish(&platform, "Hi", &[], &PostStyle::default())
            .await
            .unwrap();
        assert_eq!(result.remote_post_id, None);
    }

    #[tokio::test]
    async fn platform_rejection_surfaces() {
        let platform = MockPlatform::new().failing_post();
        let err = publish(&platform, "Hi", &[], &PostStyle::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Rejected(PlatformError::Status { status: 500, .. })
        ));
    }
}
