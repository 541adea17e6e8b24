use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::repos::{
    CreatedAtOrder, FEED_PAGE_LIMIT, PostQuery, PostsRepo, RepoError,
};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::super::PostgresRepositories;
use super::POST_COLUMNS;

impl PostgresRepositories {
    fn push_post_order(qb: &mut QueryBuilder<'_, Postgres>, order: CreatedAtOrder) {
        match order {
            CreatedAtOrder::NewestFirst => qb.push(" ORDER BY p.created_at DESC, p.id DESC"),
            CreatedAtOrder::OldestFirst => qb.push(" ORDER BY p.created_at ASC, p.id ASC"),
        };
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        let limit = i64::from(query.limit.clamp(1, FEED_PAGE_LIMIT));

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts p WHERE 1=1");

        if let Some(author_id) = query.author_id.as_ref() {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }

        Self::push_post_order(&mut qb, query.order);
        qb.push(" LIMIT ");
        qb.push_bind(limit);

        qb.build_query_as::<PostRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}
