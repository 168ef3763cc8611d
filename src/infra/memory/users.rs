use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::pagination::{Page, PageRequest},
    application::repos::{CreateUserParams, RepoError, UpdateUserParams, UsersRepo},
    domain::entities::UserRecord,
};

use super::{MemoryRepositories, now, oldest_first};

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(oldest_first(tables.users.iter(), page))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|user| user.username.eq_ignore_ascii_case(&params.username))
        {
            return Err(RepoError::duplicate("users_username_key"));
        }
        if tables.users.iter().any(|user| user.email == params.email) {
            return Err(RepoError::duplicate("users_email_key"));
        }

        let created_at = now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            display_name: params.display_name,
            bio: params.bio,
            created_at,
            updated_at: created_at,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.display_name = params.display_name;
        user.bio = params.bio;
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|user| user.id != id);
        if tables.users.len() == before {
            return Err(RepoError::NotFound);
        }

        let authored: Vec<Uuid> = tables
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        tables.posts.retain(|post| post.author_id != id);
        tables
            .comments
            .retain(|c| c.author_id != id && !authored.contains(&c.post_id));
        tables
            .likes
            .retain(|l| l.user_id != id && !authored.contains(&l.post_id));
        tables.friendships.retain(|f| !f.involves(id));
        tables
            .messages
            .retain(|m| m.sender_id != id && m.recipient_id != id);
        tables
            .notifications
            .retain(|n| n.user_id != id && n.actor_id != id);
        Ok(())
    }
}
