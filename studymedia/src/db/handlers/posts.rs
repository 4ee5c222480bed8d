//! Database repository for posts.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::posts::{PostCreateDBRequest, PostDBResponse},
};
use crate::media::MediaDescriptor;
use crate::types::{PostId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, types::Json};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing posts
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub skip: i64,
    pub limit: i64,
    pub author_id: Option<UserId>,
}

impl PostFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            author_id: None,
        }
    }

    pub fn with_author(mut self, author_id: UserId) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub media: Json<Vec<MediaDescriptor>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostDBResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            content: post.content,
            media: post.media.0,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

pub struct Posts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Posts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count posts matching the filter, ignoring pagination
    #[instrument(skip(self), err)]
    pub async fn count(&mut self, filter: &PostFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR author_id = $1)")
            .bind(filter.author_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Oldest-first page of posts whose media still embeds a data URL.
    ///
    /// `after` is the `(created_at, id)` of the last post of the previous page.
    #[instrument(skip(self), err)]
    pub async fn list_with_data_urls(&mut self, after: Option<(DateTime<Utc>, PostId)>, limit: i64) -> Result<Vec<PostDBResponse>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, content, media, created_at, updated_at
            FROM posts
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(media) AS item
                WHERE item->>'url' LIKE 'data:%'
            )
            AND ($1::timestamptz IS NULL OR (created_at, id) > ($1::timestamptz, $2::uuid))
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(after.map(|(created_at, _)| created_at))
        .bind(after.map(|(_, id)| id))
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(posts.into_iter().map(PostDBResponse::from).collect())
    }

    /// Replace the stored attachment list. Returns false if the post does not exist.
    #[instrument(skip(self, media), fields(post_id = %abbrev_uuid(&id), count = media.len()), err)]
    pub async fn update_media(&mut self, id: PostId, media: &[MediaDescriptor]) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET media = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(Json(media))
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Posts<'c> {
    type CreateRequest = PostCreateDBRequest;
    type Response = PostDBResponse;
    type Id = PostId;
    type Filter = PostFilter;

    #[instrument(skip(self, request), fields(author_id = %abbrev_uuid(&request.author_id), media = request.media.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, content, media)
            VALUES ($1, $2, $3, $4)
            RETURNING id, author_id, content, media, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.author_id)
        .bind(&request.content)
        .bind(Json(&request.media))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(PostDBResponse::from(post))
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let post = sqlx::query_as::<_, Post>("SELECT id, author_id, content, media, created_at, updated_at FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post.map(PostDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, content, media, created_at, updated_at
            FROM posts
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(filter.author_id)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(posts.into_iter().map(PostDBResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use sqlx::PgPool;

    fn request(author_id: UserId, media: Vec<MediaDescriptor>) -> PostCreateDBRequest {
        PostCreateDBRequest {
            author_id,
            content: "Flashcards for the midterm".to_string(),
            media,
        }
    }

    #[sqlx::test]
    async fn test_create_and_get_post(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Posts::new(&mut conn);

        let author = Uuid::new_v4();
        let media = vec![
            MediaDescriptor::new(MediaKind::Image, "/uploads/0011223344556677.jpg"),
            MediaDescriptor::new(MediaKind::Video, "/uploads/8899aabbccddeeff.mp4").with_thumbnail("/uploads/thumbnails/8899aabbccddeeff.jpg"),
        ];
        let created = repo.create(&request(author, media.clone())).await.unwrap();

        assert_eq!(created.author_id, author);
        assert_eq!(created.media, media);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.media, media);
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_media_is_stored_in_persisted_shape(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let created = Posts::new(&mut conn)
            .create(&request(Uuid::new_v4(), vec![MediaDescriptor::new(MediaKind::Image, "/uploads/a.png")]))
            .await
            .unwrap();

        let raw: serde_json::Value = sqlx::query_scalar("SELECT media FROM posts WHERE id = $1")
            .bind(created.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(raw, serde_json::json!([{ "type": "image", "url": "/uploads/a.png" }]));
    }

    #[sqlx::test]
    async fn test_list_filters_and_paginates(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Posts::new(&mut conn);

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for _ in 0..3 {
            repo.create(&request(alice, vec![])).await.unwrap();
        }
        repo.create(&request(bob, vec![])).await.unwrap();

        assert_eq!(repo.list(&PostFilter::new(0, 10)).await.unwrap().len(), 4);
        assert_eq!(repo.list(&PostFilter::new(0, 2)).await.unwrap().len(), 2);
        assert_eq!(repo.list(&PostFilter::new(3, 10)).await.unwrap().len(), 1);

        let filter = PostFilter::new(0, 10).with_author(alice);
        let alices = repo.list(&filter).await.unwrap();
        assert_eq!(alices.len(), 3);
        assert!(alices.iter().all(|p| p.author_id == alice));
        assert_eq!(repo.count(&filter).await.unwrap(), 3);
        assert_eq!(repo.count(&PostFilter::new(0, 1)).await.unwrap(), 4);
    }

    #[sqlx::test]
    async fn test_list_with_data_urls_and_update_media(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Posts::new(&mut conn);

        let clean = repo
            .create(&request(Uuid::new_v4(), vec![MediaDescriptor::new(MediaKind::Image, "/uploads/a.png")]))
            .await
            .unwrap();
        let dirty = repo
            .create(&request(
                Uuid::new_v4(),
                vec![
                    MediaDescriptor::new(MediaKind::Image, "/uploads/b.png"),
                    MediaDescriptor::new(MediaKind::Image, "data:image/png;base64,AAAA"),
                ],
            ))
            .await
            .unwrap();

        let found = repo.list_with_data_urls(None, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, dirty.id);
        assert_ne!(found[0].id, clean.id);
        let after = Some((found[0].created_at, found[0].id));
        assert!(repo.list_with_data_urls(after, 10).await.unwrap().is_empty());

        let fixed = vec![
            MediaDescriptor::new(MediaKind::Image, "/uploads/b.png"),
            MediaDescriptor::new(MediaKind::Image, "/uploads/c.png"),
        ];
        assert!(repo.update_media(dirty.id, &fixed).await.unwrap());
        assert!(!repo.update_media(Uuid::new_v4(), &fixed).await.unwrap());

        assert!(repo.list_with_data_urls(None, 10).await.unwrap().is_empty());
        assert_eq!(repo.get_by_id(dirty.id).await.unwrap().unwrap().media, fixed);
    }
}
