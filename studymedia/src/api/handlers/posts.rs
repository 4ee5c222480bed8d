use crate::AppState;
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::posts::{ListPostsQuery, PostCreate, PostResponse};
use crate::db::handlers::{PostFilter, Posts, Repository};
use crate::db::models::posts::PostCreateDBRequest;
use crate::errors::{Error, Result};
use crate::types::{PostId, abbrev_uuid};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::Acquire;

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    summary = "Create post",
    description = "Create a post. Attachments holding data URLs are stored and replaced by durable URLs before the post is written.",
    request_body = PostCreate,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Invalid request"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(author_id = %abbrev_uuid(&create.author_id), media = create.media.len()))]
pub async fn create_post(State(state): State<AppState>, Json(create): Json<PostCreate>) -> Result<(StatusCode, Json<PostResponse>)> {
    if create.content.trim().is_empty() && create.media.is_empty() {
        return Err(Error::BadRequest {
            message: "A post needs content or at least one attachment".to_string(),
        });
    }

    let outcome = state.normalizer.normalize(create.media).await;
    if outcome.failed > 0 {
        tracing::warn!(failed = outcome.failed, "Post saved with attachments that could not be normalized");
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let post = Posts::new(&mut conn)
        .create(&PostCreateDBRequest {
            author_id: create.author_id,
            content: create.content,
            media: outcome.media,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    summary = "List posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "Newest posts first", body = PaginatedResponse<PostResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_posts(State(state): State<AppState>, Query(query): Query<ListPostsQuery>) -> Result<Json<PaginatedResponse<PostResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = PostFilter::new(skip, limit);
    if let Some(author_id) = query.author_id {
        filter = filter.with_author(author_id);
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Posts::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
    let posts = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PaginatedResponse::new(
        posts.into_iter().map(PostResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    summary = "Get post",
    params(("id" = uuid::Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(post_id = %abbrev_uuid(&id)))]
pub async fn get_post(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<Json<PostResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let post = Posts::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Post".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(PostResponse::from(post)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::posts::PostResponse;
    use crate::media::{MediaKind, is_data_url};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post_stores_data_url_attachments(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = create_test_app(pool, dir.path(), None).await;

        let author = Uuid::new_v4();
        let response = app
            .post("/api/v1/posts")
            .json(&json!({
                "author_id": author,
                "content": "Lab notes",
                "media": [
                    { "type": "image", "url": SAMPLE_PNG_DATA_URL },
                    { "type": "image", "url": "https://cdn.example/already.png" }
                ]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let post: PostResponse = response.json();
        assert_eq!(post.author_id, author);
        assert_eq!(post.media.len(), 2);
        assert!(post.media[0].url.starts_with("/uploads/"));
        assert!(post.media[0].url.ends_with(".png"));
        assert_eq!(post.media[1].url, "https://cdn.example/already.png");
        assert!(post.media.iter().all(|m| !is_data_url(&m.url)));

        let stored = std::fs::read_dir(dir.path().join("uploads")).unwrap().filter_map(|e| e.ok()).filter(|e| e.path().is_file()).count();
        assert_eq!(stored, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post_uses_image_host_for_images(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = create_test_app(pool, dir.path(), Some(std::sync::Arc::new(StaticImageHost::default()))).await;

        let response = app
            .post("/api/v1/posts")
            .json(&json!({
                "author_id": Uuid::new_v4(),
                "content": "",
                "media": [
                    { "type": "image", "url": SAMPLE_PNG_DATA_URL },
                    { "type": "video", "url": SAMPLE_VIDEO_DATA_URL }
                ]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let post: PostResponse = response.json();
        assert_eq!(post.media[0].url, "https://cdn.example/x.png");
        assert_eq!(post.media[0].thumbnail_url.as_deref(), Some("https://cdn.example/x_thumb.png"));
        assert_eq!(post.media[1].kind, MediaKind::Video);
        assert!(post.media[1].url.starts_with("/uploads/") && post.media[1].url.ends_with(".mp4"));
        assert!(post.media[1].thumbnail_url.as_deref().unwrap().starts_with("/uploads/thumbnails/"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_upload_keeps_data_url(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = create_test_app(pool, dir.path(), Some(std::sync::Arc::new(FailingImageHost))).await;

        let response = app
            .post("/api/v1/posts")
            .json(&json!({
                "author_id": Uuid::new_v4(),
                "content": "poster",
                "media": [{ "type": "image", "url": SAMPLE_PNG_DATA_URL }]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let post: PostResponse = response.json();
        assert_eq!(post.media[0].url, SAMPLE_PNG_DATA_URL);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_empty_post_is_rejected(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = create_test_app(pool, dir.path(), None).await;

        let response = app
            .post("/api/v1/posts")
            .json(&json!({ "author_id": Uuid::new_v4(), "content": "  " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_and_get_posts(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = create_test_app(pool, dir.path(), None).await;

        let author = Uuid::new_v4();
        let mut ids = Vec::new();
        for i in 0..3 {
            let post: PostResponse = app
                .post("/api/v1/posts")
                .json(&json!({ "author_id": author, "content": format!("post {i}") }))
                .await
                .json();
            ids.push(post.id);
        }
        app.post("/api/v1/posts")
            .json(&json!({ "author_id": Uuid::new_v4(), "content": "someone else" }))
            .await
            .assert_status(StatusCode::CREATED);

        let page: serde_json::Value = app.get("/api/v1/posts?limit=2").await.json();
        assert_eq!(page["total_count"], 4);
        assert_eq!(page["data"].as_array().unwrap().len(), 2);
        assert_eq!(page["data"][0]["content"], "someone else");

        let page: serde_json::Value = app.get(&format!("/api/v1/posts?author_id={author}")).await.json();
        assert_eq!(page["total_count"], 3);

        let post: PostResponse = app.get(&format!("/api/v1/posts/{}", ids[0])).await.json();
        assert_eq!(post.content, "post 0");

        app.get(&format!("/api/v1/posts/{}", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
