//! Friendships, direct messages and notifications.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateNotificationParams, FriendshipsRepo, MessagesRepo, NotificationsRepo, UsersRepo,
};
use crate::domain::entities::{FriendshipRecord, MessageRecord, NotificationRecord};
use crate::domain::error::DomainError;
use crate::domain::types::NotificationKind;
use crate::domain::validation::{self, MAX_MESSAGE_LEN};

#[derive(Clone)]
pub struct SocialService {
    users: Arc<dyn UsersRepo>,
    friendships: Arc<dyn FriendshipsRepo>,
    messages: Arc<dyn MessagesRepo>,
    notifications: Arc<dyn NotificationsRepo>,
}

impl SocialService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        friendships: Arc<dyn FriendshipsRepo>,
        messages: Arc<dyn MessagesRepo>,
        notifications: Arc<dyn NotificationsRepo>,
    ) -> Self {
        Self {
            users,
            friendships,
            messages,
            notifications,
        }
    }

    async fn require_caller(&self, caller: Uuid) -> Result<(), ServiceError> {
        match self.users.find_user(caller).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::UnknownCaller(caller)),
        }
    }

    async fn require_user(&self, id: Uuid) -> Result<(), ServiceError> {
        match self.users.find_user(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("user").into()),
        }
    }

    pub async fn befriend(
        &self,
        caller: Uuid,
        addressee: Uuid,
    ) -> Result<FriendshipRecord, ServiceError> {
        self.require_caller(caller).await?;
        if caller == addressee {
            return Err(DomainError::validation("users cannot befriend themselves").into());
        }
        self.require_user(addressee).await?;

        let friendship = self.friendships.create_friendship(caller, addressee).await?;

        let params = CreateNotificationParams {
            user_id: addressee,
            actor_id: caller,
            kind: NotificationKind::Friendship,
            subject_id: friendship.id,
        };
        if let Err(err) = self.notifications.create_notification(params).await {
            warn!(
                target = "agora::application::social",
                error = %err,
                "failed to record friendship notification"
            );
        }

        Ok(friendship)
    }

    /// Either party may end a friendship.
    pub async fn unfriend(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let friendship = self
            .friendships
            .find_friendship(id)
            .await?
            .ok_or_else(|| DomainError::not_found("friendship"))?;
        if !friendship.involves(caller) {
            return Err(DomainError::forbidden("end a friendship between other users").into());
        }
        Ok(self.friendships.delete_friendship(id).await?)
    }

    pub async fn send_message(
        &self,
        caller: Uuid,
        recipient: Uuid,
        content: &str,
    ) -> Result<MessageRecord, ServiceError> {
        self.require_caller(caller).await?;
        if caller == recipient {
            return Err(DomainError::validation("users cannot message themselves").into());
        }
        self.require_user(recipient).await?;
        let content = validation::text("content", content, MAX_MESSAGE_LEN)?;
        Ok(self
            .messages
            .create_message(caller, recipient, content)
            .await?)
    }

    pub async fn conversation(
        &self,
        a: Uuid,
        b: Uuid,
        page: PageRequest,
    ) -> Result<Page<MessageRecord>, ServiceError> {
        self.require_user(a).await?;
        self.require_user(b).await?;
        Ok(self.messages.conversation(a, b, page).await?)
    }

    pub async fn notifications(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<NotificationRecord>, ServiceError> {
        self.require_user(user_id).await?;
        Ok(self.notifications.list_notifications(user_id, page).await?)
    }

    pub async fn mark_read(
        &self,
        caller: Uuid,
        id: Uuid,
    ) -> Result<NotificationRecord, ServiceError> {
        let notification = self
            .notifications
            .find_notification(id)
            .await?
            .ok_or_else(|| DomainError::not_found("notification"))?;
        if notification.user_id != caller {
            return Err(DomainError::forbidden("read another user's notifications").into());
        }
        Ok(self.notifications.mark_read(id).await?)
    }
}
