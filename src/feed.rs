use std::collections::HashSet;

use serde::Serialize;
use spin_sdk::http::{Request, Response};

use crate::auth::current_user;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, path_id};
use crate::core::query_params::{get_int, parse_query_params};
use crate::core::store::KvStore;
use crate::follow::{get_followings, is_following};
use crate::models::models::{Post, PostView, User, UserView};
use crate::posts::{build_post_view_with_likes, get_likes};
use crate::users::{build_user_view, get_user};

/// Which subset of posts a feed draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    ByUser(String),
    FollowingOf(String),
}

/// Fixed-size pagination that never fails: out-of-range page numbers snap to
/// the nearest valid page and an empty list still has one (empty) page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    pub fn clamp(&self, requested: usize) -> usize {
        requested.clamp(1, self.num_pages())
    }

    pub fn page<T>(&self, items: Vec<T>, requested: usize) -> Page<T> {
        let number = self.clamp(requested);
        let num_pages = self.num_pages();
        let posts = items
            .into_iter()
            .skip((number - 1) * self.per_page)
            .take(self.per_page)
            .collect();

        Page {
            number,
            num_pages,
            count: self.count,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page: (number > 1).then(|| number - 1),
            next_page: (number < num_pages).then(|| number + 1),
            posts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
    pub posts: Vec<T>,
}

/// A serialized post plus the like/ownership state of the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub post: PostView,
    pub like_count: usize,
    pub liked: bool,
    pub editable: bool,
}

fn scoped_posts<S: KvStore>(store: &S, scope: &Scope) -> anyhow::Result<Vec<Post>> {
    let followed: HashSet<String> = match scope {
        Scope::FollowingOf(user_id) => get_followings(store, user_id)?.into_iter().collect(),
        _ => HashSet::new(),
    };
    if matches!(scope, Scope::FollowingOf(_)) && followed.is_empty() {
        return Ok(Vec::new());
    }

    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::new();
    for id in feed.iter() {
        if let Some(p) = store.get_json::<Post>(&post_key(id))? {
            let keep = match scope {
                Scope::All => true,
                Scope::ByUser(user_id) => &p.user_id == user_id,
                Scope::FollowingOf(_) => followed.contains(&p.user_id),
            };
            if keep {
                posts.push(p);
            }
        }
    }

    // Stable: equal timestamps keep feed order, newest insertion first
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

/// Newest-first page of the posts in `scope`, with per-viewer state resolved.
pub fn list<S: KvStore>(
    store: &S,
    scope: &Scope,
    viewer: Option<&User>,
    page: usize,
) -> anyhow::Result<Page<FeedEntry>> {
    let posts = scoped_posts(store, scope)?;
    let page = Paginator::new(posts.len(), POSTS_PER_PAGE).page(posts, page);

    let mut entries = Vec::with_capacity(page.posts.len());
    for post in &page.posts {
        let likes = get_likes(store, &post.id)?;
        entries.push(FeedEntry {
            post: build_post_view_with_likes(store, post, &likes)?,
            like_count: likes.len(),
            liked: viewer.map_or(false, |v| likes.contains(&v.id)),
            editable: viewer.map_or(false, |v| v.id == post.user_id),
        });
    }

    Ok(Page {
        number: page.number,
        num_pages: page.num_pages,
        count: page.count,
        has_previous: page.has_previous,
        has_next: page.has_next,
        previous_page: page.previous_page,
        next_page: page.next_page,
        posts: entries,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: UserView,
    pub followers_count: usize,
    pub following_count: usize,
    pub posts_count: usize,
    pub followed: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ProfilePage {
    profile: ProfileView,
    #[serde(flatten)]
    page: Page<FeedEntry>,
}

// === HTTP Handlers ===

fn requested_page(req: &Request) -> usize {
    get_int(&parse_query_params(&req.uri()), "page", 1)
}

pub fn index<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let viewer = current_user(store, req)?;
    let page = list(store, &Scope::All, viewer.as_ref(), requested_page(req))?;
    json_response(200, &page)
}

pub fn profile<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let viewer = current_user(store, req)?;
    let user_id = path_id(req.path(), "/profile/");

    let user = match get_user(store, user_id)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let page = list(store, &Scope::ByUser(user.id.clone()), viewer.as_ref(), requested_page(req))?;
    let view = build_user_view(store, &user)?;
    let followed = match &viewer {
        Some(v) => is_following(store, &v.id, &user.id)?,
        None => false,
    };

    json_response(
        200,
        &ProfilePage {
            profile: ProfileView {
                followers_count: view.followers.len(),
                following_count: view.following.len(),
                posts_count: page.count,
                followed,
                user: view,
            },
            page,
        },
    )
}

pub fn following<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let viewer = match current_user(store, req)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let page = list(store, &Scope::FollowingOf(viewer.id.clone()), Some(&viewer), requested_page(req))?;
    json_response(200, &page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::follow::toggle_follow;
    use crate::posts::{create_post, toggle_like};
    use crate::users::create_account;
    use chrono::{Duration, Utc};

    #[test]
    fn paginator_clamps_to_nearest_page() {
        let p = Paginator::new(25, 10);
        assert_eq!(p.num_pages(), 3);
        assert_eq!(p.clamp(0), 1);
        assert_eq!(p.clamp(2), 2);
        assert_eq!(p.clamp(99), 3);

        let last = p.page((0..25).collect::<Vec<_>>(), 99);
        assert_eq!(last.number, 3);
        assert_eq!(last.posts, vec![20, 21, 22, 23, 24]);
        assert!(last.has_previous && !last.has_next);
        assert_eq!(last.previous_page, Some(2));
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let p = Paginator::new(0, 10);
        assert_eq!(p.num_pages(), 1);
        let page = p.page(Vec::<u8>::new(), 5);
        assert_eq!(page.number, 1);
        assert!(page.posts.is_empty());
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn feed_is_newest_first_even_when_stored_out_of_order() {
        let store = MemoryStore::new();
        let a = create_account(&store, "alice", "", "pw").unwrap();
        let older = create_post(&store, &a, "older").unwrap();
        let newer = create_post(&store, &a, "newer").unwrap();

        // Backdate the newest insertion so feed order and timestamps disagree
        let mut backdated = newer.clone();
        backdated.created_at = older.created_at - Duration::minutes(5);
        store.set_json(&post_key(&newer.id), &backdated).unwrap();

        let page = list(&store, &Scope::All, None, 1).unwrap();
        let texts: Vec<_> = page.posts.iter().map(|e| e.post.text.as_str()).collect();
        assert_eq!(texts, vec!["older", "newer"]);
    }

    #[test]
    fn equal_timestamps_keep_newest_insertion_first() {
        let store = MemoryStore::new();
        let a = create_account(&store, "alice", "", "pw").unwrap();
        let now = Utc::now();
        for text in ["one", "two", "three"] {
            let mut p = create_post(&store, &a, text).unwrap();
            p.created_at = now;
            store.set_json(&post_key(&p.id), &p).unwrap();
        }

        let page = list(&store, &Scope::All, None, 1).unwrap();
        let texts: Vec<_> = page.posts.iter().map(|e| e.post.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two", "one"]);
    }

    #[test]
    fn pages_hold_ten_posts() {
        let store = MemoryStore::new();
        let a = create_account(&store, "alice", "", "pw").unwrap();
        for i in 0..23 {
            create_post(&store, &a, &format!("post {i}")).unwrap();
        }

        let first = list(&store, &Scope::All, None, 1).unwrap();
        assert_eq!(first.posts.len(), 10);
        assert_eq!(first.num_pages, 3);
        assert_eq!(first.count, 23);

        let last = list(&store, &Scope::All, None, 7).unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(last.posts.len(), 3);
        assert_eq!(last.posts[2].post.text, "post 0");
    }

    #[test]
    fn following_scope_is_exactly_followed_authors() {
        let store = MemoryStore::new();
        let a = create_account(&store, "alice", "", "pw").unwrap();
        let b = create_account(&store, "bob", "", "pw").unwrap();
        let c = create_account(&store, "carol", "", "pw").unwrap();

        for i in 0..3 {
            create_post(&store, &b, &format!("bob {i}")).unwrap();
        }
        create_post(&store, &c, "carol 0").unwrap();

        let empty = list(&store, &Scope::FollowingOf(a.id.clone()), Some(&a), 1).unwrap();
        assert!(empty.posts.is_empty());
        assert_eq!(empty.count, 0);

        toggle_follow(&store, &a, &b.id).unwrap();
        let page = list(&store, &Scope::FollowingOf(a.id.clone()), Some(&a), 1).unwrap();
        let texts: Vec<_> = page.posts.iter().map(|e| e.post.text.as_str()).collect();
        assert_eq!(texts, vec!["bob 2", "bob 1", "bob 0"]);

        let own = list(&store, &Scope::ByUser(a.id.clone()), Some(&a), 1).unwrap();
        assert!(own.posts.is_empty());
    }

    #[test]
    fn viewer_state_is_resolved_per_entry() {
        let store = MemoryStore::new();
        let a = create_account(&store, "alice", "", "pw").unwrap();
        let b = create_account(&store, "bob", "", "pw").unwrap();
        let post = create_post(&store, &a, "hello").unwrap();
        toggle_like(&store, &b, &post.id).unwrap();

        let as_b = list(&store, &Scope::All, Some(&b), 1).unwrap();
        assert!(as_b.posts[0].liked);
        assert!(!as_b.posts[0].editable);
        assert_eq!(as_b.posts[0].like_count, 1);

        let as_a = list(&store, &Scope::All, Some(&a), 1).unwrap();
        assert!(!as_a.posts[0].liked);
        assert!(as_a.posts[0].editable);

        let anon = list(&store, &Scope::All, None, 1).unwrap();
        assert!(!anon.posts[0].liked && !anon.posts[0].editable);
    }
}
