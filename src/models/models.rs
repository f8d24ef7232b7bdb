use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

/// Public shape of a user: credentials never leave the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostView {
    pub id: String,
    pub user: String,
    pub user_id: String,
    pub text: String,
    pub timestamp: String,
    pub likes: Vec<String>,
}

pub type Followings = Vec<String>;
pub type Followers = Vec<String>;
pub type Likes = Vec<String>;
