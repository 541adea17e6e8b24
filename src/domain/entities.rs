//! Domain entities mirrored from persistent storage and the identity service.

use serde::Deserialize;

pub use chirp_api_types::{
    Author as AuthorProfile, Post as PostRecord, PostWithAuthor as EnrichedPost,
};

/// Profile as reported by the identity service. Any field other than `id` may
/// be missing; [`AuthorProfile`] is the validated form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "profile_image_url", alias = "image_url")]
    pub profile_picture: Option<String>,
}

impl ProfileRecord {
    /// Promote to a public profile. Returns `None` when the username is absent
    /// or empty.
    pub fn into_author(self) -> Option<AuthorProfile> {
        let username = self.username.filter(|name| !name.is_empty())?;
        Some(AuthorProfile {
            id: self.id,
            username,
            profile_picture: self.profile_picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: Option<&str>) -> ProfileRecord {
        ProfileRecord {
            id: "user_1".to_string(),
            username: username.map(str::to_string),
            profile_picture: Some("https://img.example/1.png".to_string()),
        }
    }

    #[test]
    fn into_author_keeps_public_fields() {
        let author = profile(Some("ferris")).into_author().expect("author");
        assert_eq!(author.id, "user_1");
        assert_eq!(author.username, "ferris");
        assert_eq!(
            author.profile_picture.as_deref(),
            Some("https://img.example/1.png")
        );
    }

    #[test]
    fn into_author_rejects_missing_or_empty_username() {
        assert!(profile(None).into_author().is_none());
        assert!(profile(Some("")).into_author().is_none());
    }

    #[test]
    fn deserializes_identity_service_field_names() {
        let record: ProfileRecord = serde_json::from_str(
            r#"{"id":"user_2","username":"crab","profile_image_url":"https://img.example/2.png"}"#,
        )
        .expect("decode profile");
        assert_eq!(record.username.as_deref(), Some("crab"));
        assert_eq!(
            record.profile_picture.as_deref(),
            Some("https://img.example/2.png")
        );
    }
}
