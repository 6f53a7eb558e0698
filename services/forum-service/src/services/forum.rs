//! Categories, posts, comments and reactions.

use crate::models::{Category, Comment, Post, ReactionCounts, ReactionKind, ReactionTarget};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

/// Default page size for post listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// `WHERE` clause shared by the post listing and its count.
const POST_FILTER_SQL: &str = "WHERE (? IS NULL OR category_id = ?)
    AND (? IS NULL OR user_id = ?)
    AND (? IS NULL OR EXISTS (
        SELECT 1 FROM reactions r
        WHERE r.target_type = 'post' AND r.target_id = posts.id
          AND r.user_id = ? AND r.kind = 'like'))";

/// Optional filters for [`ForumRepository::list_posts`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PostFilter {
    /// Only posts in this category.
    pub category_id: Option<i64>,
    /// Only posts by this author.
    pub user_id: Option<i64>,
    /// Only posts this user liked.
    pub liked_by_user: Option<i64>,
}

/// One page of a post listing. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    /// Page from raw query values. A missing or non-positive page is the first
    /// page; a size outside `1..=MAX_PAGE_SIZE` falls back to the default.
    #[must_use]
    pub fn new(number: Option<i64>, size: Option<i64>) -> Self {
        Self {
            number: number.filter(|n| *n > 0).unwrap_or(1),
            size: size
                .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn number(self) -> i64 {
        self.number
    }

    /// Rows per page.
    #[must_use]
    pub const fn size(self) -> i64 {
        self.size
    }

    /// Pages needed for `total` rows.
    #[must_use]
    pub const fn page_count(self, total: i64) -> i64 {
        (total + self.size - 1) / self.size
    }

    const fn offset(self) -> i64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// SQLite-backed forum content repository.
#[derive(Debug, Clone)]
pub struct ForumRepository {
    pool: SqlitePool,
}

impl ForumRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All categories, by name.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    /// Whether a category with this id exists.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn category_exists(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    /// One page of posts matching `filter`, newest first, with the total number
    /// of matching posts.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn list_posts(
        &self,
        filter: PostFilter,
        page: Page,
    ) -> Result<(Vec<Post>, i64), sqlx::Error> {
        let count_sql = format!("SELECT COUNT(*) FROM posts {POST_FILTER_SQL}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.category_id)
            .bind(filter.category_id)
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(filter.liked_by_user)
            .bind(filter.liked_by_user)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT id, user_id, category_id, title, content, created_at FROM posts
             {POST_FILTER_SQL}
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        let posts = sqlx::query_as::<_, Post>(&list_sql)
            .bind(filter.category_id)
            .bind(filter.category_id)
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(filter.liked_by_user)
            .bind(filter.liked_by_user)
            .bind(page.size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((posts, total))
    }

    /// One post by id.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            "SELECT id, user_id, category_id, title, content, created_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a post.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure, including a foreign key violation
    /// for an unknown category.
    pub async fn create_post(
        &self,
        user_id: i64,
        category_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Post, sqlx::Error> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (user_id, category_id, title, content, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, user_id, category_id, title, content, created_at",
        )
        .bind(user_id)
        .bind(category_id)
        .bind(title)
        .bind(content)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(post_id = post.id, user_id, "Post created");
        Ok(post)
    }

    /// Replace a post's category, title and body. `None` if the post is gone.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn update_post(
        &self,
        id: i64,
        category_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Post>, sqlx::Error> {
        let post = sqlx::query_as::<_, Post>(
            "UPDATE posts SET category_id = ?, title = ?, content = ? WHERE id = ?
             RETURNING id, user_id, category_id, title, content, created_at",
        )
        .bind(category_id)
        .bind(title)
        .bind(content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if post.is_some() {
            tracing::debug!(post_id = id, "Post updated");
        }
        Ok(post)
    }

    /// Delete a post with its comments and every reaction on either.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        if deleted {
            tracing::debug!(post_id = id, "Post deleted");
        }
        Ok(deleted)
    }

    /// Comments on a post, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, content, created_at FROM comments
             WHERE post_id = ? ORDER BY created_at, id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a comment.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn create_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, user_id, content, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, post_id, user_id, content, created_at",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(comment_id = comment.id, post_id, user_id, "Comment created");
        Ok(comment)
    }

    /// Whether the reaction target exists.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn target_exists(
        &self,
        target: ReactionTarget,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let sql = match target {
            ReactionTarget::Post => "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?)",
            ReactionTarget::Comment => "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?)",
        };
        sqlx::query_scalar(sql).bind(id).fetch_one(&self.pool).await
    }

    /// Apply a like/dislike. The same kind again removes it; the other kind
    /// replaces it. Returns the user's reaction after the change.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn toggle_reaction(
        &self,
        user_id: i64,
        target: ReactionTarget,
        target_id: i64,
        kind: ReactionKind,
    ) -> Result<Option<ReactionKind>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT kind FROM reactions WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target.as_str())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if existing.as_deref().and_then(ReactionKind::parse) == Some(kind) {
            sqlx::query(
                "DELETE FROM reactions WHERE user_id = ? AND target_type = ? AND target_id = ?",
            )
            .bind(user_id)
            .bind(target.as_str())
            .bind(target_id)
            .execute(&mut *tx)
            .await?;
            None
        } else {
            sqlx::query(
                "INSERT INTO reactions (user_id, target_type, target_id, kind, created_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (user_id, target_type, target_id)
                 DO UPDATE SET kind = excluded.kind, created_at = excluded.created_at",
            )
            .bind(user_id)
            .bind(target.as_str())
            .bind(target_id)
            .bind(kind.as_str())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
            Some(kind)
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Like/dislike totals for one target.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn reaction_counts(
        &self,
        target: ReactionTarget,
        target_id: i64,
    ) -> Result<ReactionCounts, sqlx::Error> {
        let (likes, dislikes): (i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(kind = 'like'), 0),
                COALESCE(SUM(kind = 'dislike'), 0)
             FROM reactions WHERE target_type = ? AND target_id = ?",
        )
        .bind(target.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReactionCounts { likes, dislikes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> (ForumRepository, i64, i64) {
        let pool = db::connect_in_memory().await.unwrap();
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO users (username, email, password_hash, created_at)
                 VALUES (?, ?, 'x', 0) RETURNING id",
            )
            .bind(name)
            .bind(format!("{name}@example.com"))
            .fetch_one(&pool)
            .await
            .unwrap();
            ids.push(id);
        }
        (ForumRepository::new(pool), ids[0], ids[1])
    }

    async fn reaction_rows(forum: &ForumRepository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM reactions")
            .fetch_one(&forum.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_categories_seeded() {
        let (forum, _, _) = setup().await;
        let categories = forum.list_categories().await.unwrap();
        assert_eq!(categories.len(), 4);
        assert!(forum.category_exists(categories[0].id).await.unwrap());
        assert!(!forum.category_exists(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_post_filters() {
        let (forum, alice, bob) = setup().await;
        forum.create_post(alice, 1, "a1", "body").await.unwrap();
        forum.create_post(alice, 2, "a2", "body").await.unwrap();
        forum.create_post(bob, 1, "b1", "body").await.unwrap();

        let (all, total) = forum
            .list_posts(PostFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "b1");

        let (by_alice, total) = forum
            .list_posts(
                PostFilter {
                    user_id: Some(alice),
                    ..PostFilter::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(by_alice.len(), 2);

        let (alice_in_one, _) = forum
            .list_posts(
                PostFilter {
                    category_id: Some(1),
                    user_id: Some(alice),
                    liked_by_user: None,
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(alice_in_one.len(), 1);
        assert_eq!(alice_in_one[0].title, "a1");
    }

    #[tokio::test]
    async fn test_liked_by_user_filter() {
        let (forum, alice, bob) = setup().await;
        let liked = forum.create_post(alice, 1, "liked", "body").await.unwrap();
        let disliked = forum.create_post(alice, 1, "disliked", "body").await.unwrap();
        forum.create_post(alice, 1, "ignored", "body").await.unwrap();

        forum
            .toggle_reaction(bob, ReactionTarget::Post, liked.id, ReactionKind::Like)
            .await
            .unwrap();
        forum
            .toggle_reaction(bob, ReactionTarget::Post, disliked.id, ReactionKind::Dislike)
            .await
            .unwrap();

        let filter = PostFilter {
            liked_by_user: Some(bob),
            ..PostFilter::default()
        };
        let (posts, total) = forum.list_posts(filter, Page::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].id, liked.id);

        let (none, total) = forum
            .list_posts(
                PostFilter {
                    liked_by_user: Some(alice),
                    ..PostFilter::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_pagination() {
        let (forum, alice, _) = setup().await;
        for n in 0..5 {
            forum.create_post(alice, 1, &format!("p{n}"), "body").await.unwrap();
        }

        let page = Page::new(Some(2), Some(2));
        let (posts, total) = forum.list_posts(PostFilter::default(), page).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.page_count(total), 3);
        assert_eq!(
            posts.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(),
            ["p2", "p1"]
        );

        let (past_end, _) = forum
            .list_posts(PostFilter::default(), Page::new(Some(9), Some(2)))
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(None, None), Page::new(Some(1), Some(DEFAULT_PAGE_SIZE)));
        assert_eq!(Page::new(Some(0), Some(0)).number(), 1);
        assert_eq!(Page::new(Some(-4), Some(101)).size(), DEFAULT_PAGE_SIZE);
        assert_eq!(Page::new(Some(3), Some(MAX_PAGE_SIZE)).size(), MAX_PAGE_SIZE);
        assert_eq!(Page::default().page_count(0), 0);
        assert_eq!(Page::default().page_count(10), 1);
        assert_eq!(Page::default().page_count(11), 2);
    }

    #[tokio::test]
    async fn test_update_post() {
        let (forum, alice, _) = setup().await;
        let post = forum.create_post(alice, 1, "before", "old").await.unwrap();

        let updated = forum
            .update_post(post.id, 2, "after", "new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.user_id, alice);
        assert_eq!(updated.category_id, 2);
        assert_eq!(updated.title, "after");
        assert_eq!(updated.created_at, post.created_at);

        assert!(forum.update_post(9999, 1, "x", "y").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments_and_reactions() {
        let (forum, alice, bob) = setup().await;
        let post = forum.create_post(alice, 1, "t", "c").await.unwrap();
        let comment = forum.create_comment(post.id, bob, "c").await.unwrap();
        forum
            .toggle_reaction(bob, ReactionTarget::Post, post.id, ReactionKind::Like)
            .await
            .unwrap();
        forum
            .toggle_reaction(alice, ReactionTarget::Comment, comment.id, ReactionKind::Like)
            .await
            .unwrap();

        assert!(forum.delete_post(post.id).await.unwrap());
        assert!(!forum.delete_post(post.id).await.unwrap());

        assert!(forum.list_comments(post.id).await.unwrap().is_empty());
        assert_eq!(reaction_rows(&forum).await, 0);
    }

    #[tokio::test]
    async fn test_account_deletion_removes_reactions_on_its_content() {
        let (forum, alice, bob) = setup().await;
        let post = forum.create_post(alice, 1, "t", "c").await.unwrap();
        let comment = forum.create_comment(post.id, alice, "c").await.unwrap();
        let survivor = forum.create_post(bob, 1, "kept", "c").await.unwrap();

        for (target, id) in [
            (ReactionTarget::Post, post.id),
            (ReactionTarget::Comment, comment.id),
            (ReactionTarget::Post, survivor.id),
        ] {
            forum
                .toggle_reaction(bob, target, id, ReactionKind::Like)
                .await
                .unwrap();
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(alice)
            .execute(&forum.pool)
            .await
            .unwrap();

        assert_eq!(reaction_rows(&forum).await, 1);
        assert_eq!(
            forum
                .reaction_counts(ReactionTarget::Post, survivor.id)
                .await
                .unwrap()
                .likes,
            1
        );
    }

    #[tokio::test]
    async fn test_comments() {
        let (forum, alice, bob) = setup().await;
        let post = forum.create_post(alice, 1, "t", "c").await.unwrap();
        forum.create_comment(post.id, bob, "first").await.unwrap();
        forum.create_comment(post.id, alice, "second").await.unwrap();

        let comments = forum.list_comments(post.id).await.unwrap();
        assert_eq!(
            comments.iter().map(|c| c.content.as_str()).collect::<Vec<_>>(),
            ["first", "second"]
        );
        assert!(forum.get_post(post.id).await.unwrap().is_some());
        assert!(forum.get_post(post.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reaction_toggle() {
        let (forum, alice, bob) = setup().await;
        let post = forum.create_post(alice, 1, "t", "c").await.unwrap();
        let target = ReactionTarget::Post;

        let like = forum
            .toggle_reaction(alice, target, post.id, ReactionKind::Like)
            .await
            .unwrap();
        forum
            .toggle_reaction(bob, target, post.id, ReactionKind::Like)
            .await
            .unwrap();
        assert_eq!(like, Some(ReactionKind::Like));
        assert_eq!(
            forum.reaction_counts(target, post.id).await.unwrap(),
            ReactionCounts { likes: 2, dislikes: 0 }
        );

        // Switching kind replaces
        let switched = forum
            .toggle_reaction(alice, target, post.id, ReactionKind::Dislike)
            .await
            .unwrap();
        assert_eq!(switched, Some(ReactionKind::Dislike));
        assert_eq!(
            forum.reaction_counts(target, post.id).await.unwrap(),
            ReactionCounts { likes: 1, dislikes: 1 }
        );

        // Same kind again removes
        let removed = forum
            .toggle_reaction(alice, target, post.id, ReactionKind::Dislike)
            .await
            .unwrap();
        assert_eq!(removed, None);
        assert_eq!(
            forum.reaction_counts(target, post.id).await.unwrap(),
            ReactionCounts { likes: 1, dislikes: 0 }
        );
    }

    #[tokio::test]
    async fn test_reaction_targets_are_separate() {
        let (forum, alice, _) = setup().await;
        let post = forum.create_post(alice, 1, "t", "c").await.unwrap();
        let comment = forum.create_comment(post.id, alice, "c").await.unwrap();

        forum
            .toggle_reaction(alice, ReactionTarget::Comment, comment.id, ReactionKind::Like)
            .await
            .unwrap();

        assert!(forum.target_exists(ReactionTarget::Comment, comment.id).await.unwrap());
        assert!(!forum.target_exists(ReactionTarget::Comment, 9999).await.unwrap());
        assert_eq!(
            forum.reaction_counts(ReactionTarget::Post, post.id).await.unwrap(),
            ReactionCounts::default()
        );
        assert_eq!(
            forum
                .reaction_counts(ReactionTarget::Comment, comment.id)
                .await
                .unwrap()
                .likes,
            1
        );
    }
}
