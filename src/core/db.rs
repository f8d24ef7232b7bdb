use crate::config::*;
use crate::core::store::KvStore;
use crate::follow::{get_followings, toggle_follow};
use crate::models::models::User;
use crate::posts::create_post;
use crate::users::{create_account, find_by_username};

const DEMO_ACCOUNTS: &[(&str, &[&str])] = &[
    ("test", &["This is my first post!"]),
    (
        "alice",
        &[
            "Welcome to my page! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    ),
    (
        "bob",
        &["Hey everyone! Just joined, looking forward to connecting with you all."],
    ),
];

fn demo_account<S: KvStore>(store: &S, username: &str, posts: &[&str]) -> anyhow::Result<User> {
    if let Some(existing) = find_by_username(store, username)? {
        return Ok(existing);
    }

    // Demo passwords equal the username
    let user = create_account(store, username, &format!("{}@example.com", username), username)?;
    for text in posts {
        create_post(store, &user, text)?;
    }
    Ok(user)
}

/// Seeds the demo accounts, their posts and a `test -> bob` follow edge.
/// Running it again leaves existing data untouched.
pub fn init_demo_data<S: KvStore>(store: &S) -> anyhow::Result<()> {
    let mut accounts = Vec::new();
    for (username, posts) in DEMO_ACCOUNTS {
        accounts.push(demo_account(store, username, posts)?);
    }

    if let (Some(test), Some(bob)) = (
        accounts.iter().find(|u| u.username == "test"),
        accounts.iter().find(|u| u.username == "bob"),
    ) {
        if !get_followings(store, &test.id)?.contains(&bob.id) {
            toggle_follow(store, test, &bob.id)?;
        }
    }

    tracing::info!(accounts = accounts.len(), "demo data ready");
    Ok(())
}

pub fn reset_db_data<S: KvStore>(store: &S) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    for id in &users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            store.delete(&username_key(&u.username))?;
        }
        store.delete(&user_key(id))?;
        store.delete(&followers_key(id))?;
        store.delete(&followings_key(id))?;
    }

    let posts: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    for id in posts {
        store.delete(&post_key(&id))?;
        store.delete(&likes_key(&id))?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in tokens {
        store.delete(&token_key(&token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(FEED_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::feed::{list, Scope};

    #[test]
    fn demo_seed_is_idempotent() {
        let store = MemoryStore::new();
        init_demo_data(&store).unwrap();
        init_demo_data(&store).unwrap();

        let users: Vec<String> = store.get_json(USERS_LIST_KEY).unwrap().unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(list(&store, &Scope::All, None, 1).unwrap().count, 4);

        let test = find_by_username(&store, "test").unwrap().unwrap();
        let following = list(&store, &Scope::FollowingOf(test.id), None, 1).unwrap();
        assert_eq!(following.count, 1);
    }

    #[test]
    fn reset_clears_everything() {
        let store = MemoryStore::new();
        init_demo_data(&store).unwrap();
        reset_db_data(&store).unwrap();

        assert_eq!(find_by_username(&store, "alice").unwrap(), None);
        assert_eq!(list(&store, &Scope::All, None, 1).unwrap().count, 0);
        assert_eq!(store.get_json::<Vec<String>>(USERS_LIST_KEY).unwrap(), None);
    }
}
