pub const MAX_POST_LENGTH: usize = 280;
pub const POSTS_PER_PAGE: usize = 10;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const SESSION_COOKIE: &str = "session";

pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";
pub const TOKENS_LIST_KEY: &str = "tokens_list";

pub fn token_expiration_hours() -> i64 {
    std::env::var("PERCH_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn bind_addr() -> String {
    std::env::var("PERCH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string())
}

pub fn seed_demo_data() -> bool {
    std::env::var("PERCH_SEED_DEMO")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn likes_key(post_id: &str) -> String {
    format!("likes:{}", post_id)
}

pub fn followers_key(user_id: &str) -> String {
    format!("followers:{}", user_id)
}

pub fn followings_key(user_id: &str) -> String {
    format!("followings:{}", user_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}
