//! In-memory repository implementations.
//!
//! Every table is an insertion-ordered `Vec` behind one async lock, so each
//! repository call sees a consistent snapshot and cascades apply atomically.

mod posts;
mod social;
mod users;

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    CommentRecord, FriendshipRecord, LikeRecord, MessageRecord, NotificationRecord, PostRecord,
    UserRecord,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    likes: Vec<LikeRecord>,
    friendships: Vec<FriendshipRecord>,
    messages: Vec<MessageRecord>,
    notifications: Vec<NotificationRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryRepositories {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Page over matching rows, most recently inserted first.
fn newest_first<'a, T: Clone + 'a>(
    rows: impl DoubleEndedIterator<Item = &'a T>,
    page: PageRequest,
) -> Page<T> {
    Page::from_sorted(rows.rev().cloned().collect(), page)
}

/// Page over matching rows in insertion order.
fn oldest_first<'a, T: Clone + 'a>(rows: impl Iterator<Item = &'a T>, page: PageRequest) -> Page<T> {
    Page::from_sorted(rows.cloned().collect(), page)
}
