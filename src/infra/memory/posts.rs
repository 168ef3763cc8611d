use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::pagination::{Page, PageRequest},
    application::repos::{CommentsRepo, LikesRepo, PostsRepo, RepoError},
    cache::ParentResolver,
    domain::entities::{CommentRecord, LikeRecord, PostRecord},
};

use super::{MemoryRepositories, newest_first, now, oldest_first};

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.posts.iter(), page))
    }

    async fn list_posts_by_author(
        &self,
        author_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.posts.iter().filter(|post| post.author_id == author_id),
            page,
        ))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        content: String,
    ) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|user| user.id == author_id) {
            return Err(RepoError::Integrity {
                message: format!("author `{author_id}` does not exist"),
            });
        }

        let created_at = now();
        let post = PostRecord {
            id: Uuid::new_v4(),
            author_id,
            content,
            created_at,
            updated_at: created_at,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, content: String) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.content = content;
        post.updated_at = now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|comment| comment.post_id != id);
        tables.likes.retain(|like| like.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(oldest_first(
            tables.comments.iter().filter(|c| c.post_id == post_id),
            page,
        ))
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|post| post.id == post_id) {
            return Err(RepoError::Integrity {
                message: format!("post `{post_id}` does not exist"),
            });
        }

        let created_at = now();
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            created_at,
            updated_at: created_at,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, content: String) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.content = content;
        comment.updated_at = now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LikesRepo for MemoryRepositories {
    async fn list_likes(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LikeRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.likes.iter().filter(|like| like.post_id == post_id),
            page,
        ))
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .likes
            .iter()
            .any(|like| like.post_id == post_id && like.user_id == user_id)
        {
            return Err(RepoError::duplicate("likes_post_id_user_id_key"));
        }

        let like = LikeRecord {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: now(),
        };
        tables.likes.push(like.clone());
        Ok(like)
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.likes.len();
        tables
            .likes
            .retain(|like| !(like.post_id == post_id && like.user_id == user_id));
        if tables.likes.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ParentResolver for MemoryRepositories {
    async fn post_of_comment(&self, comment_id: &str) -> Option<String> {
        let id = Uuid::parse_str(comment_id).ok()?;
        let tables = self.tables.read().await;
        tables
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.post_id.to_string())
    }
}
