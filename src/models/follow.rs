use uuid::Uuid;

/// Name of the (user, following) uniqueness constraint.
pub const UNIQUE_SUBSCRIBE: &str = "unique_subscribe";
pub const UNIQUE_SUBSCRIBE_MESSAGE: &str = "Такая подписка уже существует!";

/// Name of the user <> following check constraint.
pub const FOLLOWING_IS_NOT_USER: &str = "following_is_not_user";
pub const FOLLOWING_IS_NOT_USER_MESSAGE: &str = "Поля \"user\" и \"following\" должны различаться!";

#[derive(Debug, Clone)]
pub struct Follow {
    pub id: i64,
    pub user_id: Uuid,
    pub user_username: String,
    pub following_id: Uuid,
    pub following_username: String,
}

#[derive(Debug, Clone, Copy)]
pub struct NewFollow {
    pub user_id: Uuid,
    pub following_id: Uuid,
}
