use std::sync::Arc;

use crate::application::posts::PostService;
use crate::application::social::SocialService;
use crate::application::users::UserService;
use crate::cache::CacheState;

#[derive(Clone)]
pub struct ApiState {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub social: Arc<SocialService>,
    pub cache: CacheState,
}
