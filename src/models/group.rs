use serde::Deserialize;

pub const TITLE_MAX_LENGTH: usize = 200;
pub const SLUG_MAX_LENGTH: usize = 50;

pub const UNIQUE_SLUG: &str = "unique_group_slug";
pub const UNIQUE_SLUG_MESSAGE: &str = "Группа с таким slug уже существует.";

#[derive(Debug, Clone)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}
