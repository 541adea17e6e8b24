use std::collections::HashSet;

use sqlx::PgPool;

async fn index_names(pool: &PgPool, table: &str) -> HashSet<String> {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = $1",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .expect("fetch indexes");
    rows.into_iter().collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_indexes_exist(pool: PgPool) {
    let indexes = index_names(&pool, "posts").await;

    assert!(
        indexes.contains("posts_created_at_id_idx"),
        "missing posts_created_at_id_idx"
    );
    assert!(
        indexes.contains("posts_author_created_at_idx"),
        "missing posts_author_created_at_idx"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn rate_limit_index_exists(pool: PgPool) {
    let indexes = index_names(&pool, "rate_limit_events").await;

    assert!(
        indexes.contains("rate_limit_events_key_recorded_at_idx"),
        "missing rate_limit_events_key_recorded_at_idx"
    );
}
