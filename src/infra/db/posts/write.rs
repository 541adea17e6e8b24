use async_trait::async_trait;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::super::PostgresRepositories;

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn insert_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams { author_id, content } = params;

        sqlx::query_as::<_, PostRecord>(
            r#"
            INSERT INTO posts (content, author_id)
            VALUES ($1, $2)
            RETURNING id, content, author_id, created_at
            "#,
        )
        .bind(content.into_inner())
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
