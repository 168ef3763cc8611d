use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateUserParams, FriendshipsRepo, PostsRepo, UpdateUserParams, UsersRepo,
};
use crate::domain::entities::{PostRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::validation::{self, MAX_BIO_LEN, MAX_DISPLAY_NAME_LEN};

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateUserCommand {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
    friendships: Arc<dyn FriendshipsRepo>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        posts: Arc<dyn PostsRepo>,
        friendships: Arc<dyn FriendshipsRepo>,
    ) -> Self {
        Self {
            users,
            posts,
            friendships,
        }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<UserRecord>, ServiceError> {
        Ok(self.users.list_users(page).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserRecord, ServiceError> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    pub async fn create(&self, command: CreateUserCommand) -> Result<UserRecord, ServiceError> {
        let username = validation::username(&command.username)?;
        let email = validation::email(&command.email)?;
        let display_name = validation::optional_text(
            "display_name",
            command.display_name.as_deref(),
            MAX_DISPLAY_NAME_LEN,
        )?
        .unwrap_or_else(|| username.clone());
        let bio = validation::optional_text("bio", command.bio.as_deref(), MAX_BIO_LEN)?;

        Ok(self
            .users
            .create_user(CreateUserParams {
                username,
                email,
                display_name,
                bio,
            })
            .await?)
    }

    /// Users may only edit their own profile.
    pub async fn update(
        &self,
        caller: Uuid,
        id: Uuid,
        command: UpdateUserCommand,
    ) -> Result<UserRecord, ServiceError> {
        let current = self.get(id).await?;
        if caller != current.id {
            return Err(DomainError::forbidden("edit another user's profile").into());
        }

        let display_name = validation::optional_text(
            "display_name",
            command.display_name.as_deref(),
            MAX_DISPLAY_NAME_LEN,
        )?
        .unwrap_or(current.display_name);
        let bio = match command.bio.as_deref() {
            Some(raw) => validation::optional_text("bio", Some(raw), MAX_BIO_LEN)?,
            None => current.bio,
        };

        Ok(self
            .users
            .update_user(UpdateUserParams {
                id,
                display_name,
                bio,
            })
            .await?)
    }

    pub async fn delete(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let current = self.get(id).await?;
        if caller != current.id {
            return Err(DomainError::forbidden("delete another user").into());
        }
        Ok(self.users.delete_user(id).await?)
    }

    pub async fn posts_of(
        &self,
        id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, ServiceError> {
        self.get(id).await?;
        Ok(self.posts.list_posts_by_author(id, page).await?)
    }

    pub async fn friends_of(
        &self,
        id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserRecord>, ServiceError> {
        self.get(id).await?;
        Ok(self.friendships.list_friends(id, page).await?)
    }

    /// Resolve the caller, rejecting ids that do not belong to a user.
    pub async fn require_caller(&self, caller: Uuid) -> Result<UserRecord, ServiceError> {
        self.users
            .find_user(caller)
            .await?
            .ok_or(ServiceError::UnknownCaller(caller))
    }
}
