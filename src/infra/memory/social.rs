use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::pagination::{Page, PageRequest},
    application::repos::{
        CreateNotificationParams, FriendshipsRepo, MessagesRepo, NotificationsRepo, RepoError,
    },
    domain::entities::{FriendshipRecord, MessageRecord, NotificationRecord, UserRecord},
};

use super::{MemoryRepositories, newest_first, now, oldest_first};

#[async_trait]
impl FriendshipsRepo for MemoryRepositories {
    async fn list_friends(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserRecord>, RepoError> {
        let tables = self.tables.read().await;
        let friends: Vec<UserRecord> = tables
            .friendships
            .iter()
            .filter_map(|f| f.friend_of(user_id))
            .filter_map(|friend| tables.users.iter().find(|u| u.id == friend).cloned())
            .collect();
        Ok(Page::from_sorted(friends, page))
    }

    async fn find_friendship(&self, id: Uuid) -> Result<Option<FriendshipRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.friendships.iter().find(|f| f.id == id).cloned())
    }

    async fn create_friendship(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
    ) -> Result<FriendshipRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .friendships
            .iter()
            .any(|f| f.friend_of(requester_id) == Some(addressee_id))
        {
            return Err(RepoError::duplicate("friendships_pair_key"));
        }

        let friendship = FriendshipRecord {
            id: Uuid::new_v4(),
            requester_id,
            addressee_id,
            created_at: now(),
        };
        tables.friendships.push(friendship.clone());
        Ok(friendship)
    }

    async fn delete_friendship(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.friendships.len();
        tables.friendships.retain(|f| f.id != id);
        if tables.friendships.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MessagesRepo for MemoryRepositories {
    async fn create_message(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: String,
    ) -> Result<MessageRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let message = MessageRecord {
            id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            content,
            created_at: now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation(
        &self,
        a: Uuid,
        b: Uuid,
        page: PageRequest,
    ) -> Result<Page<MessageRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(oldest_first(
            tables.messages.iter().filter(|m| m.between(a, b)),
            page,
        ))
    }
}

#[async_trait]
impl NotificationsRepo for MemoryRepositories {
    async fn list_notifications(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<NotificationRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.notifications.iter().filter(|n| n.user_id == user_id),
            page,
        ))
    }

    async fn find_notification(&self, id: Uuid) -> Result<Option<NotificationRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn create_notification(
        &self,
        params: CreateNotificationParams,
    ) -> Result<NotificationRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let notification = NotificationRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            actor_id: params.actor_id,
            kind: params.kind,
            subject_id: params.subject_id,
            read: false,
            created_at: now(),
        };
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn mark_read(&self, id: Uuid) -> Result<NotificationRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepoError::NotFound)?;
        notification.read = true;
        Ok(notification.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn friendship_pairs_are_unique_in_both_directions() {
        let repos = MemoryRepositories::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        repos.create_friendship(a, b).await.unwrap();

        assert!(matches!(
            repos.create_friendship(b, a).await,
            Err(RepoError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn conversation_includes_both_directions_in_order() {
        let repos = MemoryRepositories::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let first = repos.create_message(a, b, "hi".to_string()).await.unwrap();
        repos.create_message(a, c, "elsewhere".to_string()).await.unwrap();
        let reply = repos.create_message(b, a, "hey".to_string()).await.unwrap();

        let page = repos
            .conversation(b, a, PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first.id, reply.id]);
    }
}
