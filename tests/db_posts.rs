use chirp::application::repos::{
    CreatePostParams, CreatedAtOrder, PostQuery, PostsRepo, PostsWriteRepo, RepoError,
};
use chirp::domain::entities::PostRecord;
use chirp::domain::posts::PostContent;
use chirp::infra::db::PostgresRepositories;
use sqlx::PgPool;
use uuid::Uuid;

async fn insert(repos: &PostgresRepositories, author: &str, content: &str) -> PostRecord {
    repos
        .insert_post(CreatePostParams {
            author_id: author.to_string(),
            content: PostContent::parse(content).expect("valid content"),
        })
        .await
        .expect("insert post")
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_assigns_id_and_timestamp(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let post = insert(&repos, "alice", "hello").await;
    assert_eq!(post.author_id, "alice");
    assert_eq!(post.content, "hello");
    assert_ne!(post.id, Uuid::nil());

    let found = repos.find_by_id(post.id).await.expect("find");
    assert_eq!(found, Some(post));
    assert!(repos.find_by_id(Uuid::new_v4()).await.expect("find").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn feeds_are_newest_first_and_filtered(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let first = insert(&repos, "alice", "one").await;
    let second = insert(&repos, "bob", "two").await;
    let third = insert(&repos, "alice", "three").await;

    let all = repos.find_posts(&PostQuery::recent()).await.expect("all");
    let ids: Vec<Uuid> = all.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let alice = repos
        .find_posts(&PostQuery::by_author("alice"))
        .await
        .expect("alice");
    let ids: Vec<Uuid> = alice.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);

    let oldest = repos
        .find_posts(&PostQuery {
            order: CreatedAtOrder::OldestFirst,
            limit: 1,
            ..PostQuery::recent()
        })
        .await
        .expect("oldest");
    assert_eq!(oldest.len(), 1);
    assert_eq!(oldest[0].id, first.id);

    let nobody = repos
        .find_posts(&PostQuery::by_author("carol"))
        .await
        .expect("carol");
    assert!(nobody.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_limit_is_capped(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    for n in 0..105 {
        insert(&repos, "alice", &format!("post {n}")).await;
    }

    let posts = repos
        .find_posts(&PostQuery {
            limit: 10_000,
            ..PostQuery::recent()
        })
        .await
        .expect("posts");
    assert_eq!(posts.len(), 100);
    assert_eq!(posts[0].content, "post 104");
}

#[sqlx::test(migrations = "./migrations")]
async fn store_rejects_content_outside_bounds(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());

    let err = sqlx::query("INSERT INTO posts (content, author_id) VALUES ('', 'alice')")
        .execute(&pool)
        .await
        .map_err(chirp::infra::db::map_sqlx_error)
        .expect_err("empty content violates check");
    assert!(matches!(err, RepoError::InvalidInput { .. }));

    assert!(
        repos
            .find_posts(&PostQuery::recent())
            .await
            .expect("posts")
            .is_empty()
    );
}
