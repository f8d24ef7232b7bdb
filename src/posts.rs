use chrono::Utc;
use serde::Serialize;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::current_user;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{format_timestamp, json_response, path_id, validate_uuid};
use crate::core::query_params::read_fields;
use crate::core::store::KvStore;
use crate::models::models::{Likes, Post, PostView, User};
use crate::users::{get_user, usernames};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub likes: usize,
    pub liked: bool,
}

fn check_length(text: &str) -> Result<(), ApiError> {
    if text.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::TooLong);
    }
    Ok(())
}

pub fn get_post<S: KvStore>(store: &S, post_id: &str) -> anyhow::Result<Option<Post>> {
    if !validate_uuid(post_id) {
        return Ok(None);
    }
    store.get_json::<Post>(&post_key(post_id))
}

pub fn get_likes<S: KvStore>(store: &S, post_id: &str) -> anyhow::Result<Likes> {
    Ok(store.get_json(&likes_key(post_id))?.unwrap_or_default())
}

pub fn create_post<S: KvStore>(store: &S, owner: &User, text: &str) -> Result<Post, ApiError> {
    check_length(text)?;

    let post = Post {
        id: Uuid::new_v4().to_string(),
        user_id: owner.id.clone(),
        text: text.to_string(),
        created_at: Utc::now(),
    };

    store.set_json(&post_key(&post.id), &post)?;

    store.update_json(FEED_KEY, |feed: &mut Vec<String>| {
        feed.insert(0, post.id.clone()); // prepend newest
    })?;

    tracing::info!(post_id = %post.id, user_id = %owner.id, "post created");
    Ok(post)
}

/// The post, provided it exists and `editor` owns it.
pub fn owned_post<S: KvStore>(store: &S, editor: &User, post_id: &str) -> Result<Post, ApiError> {
    let post = get_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.user_id != editor.id {
        return Err(ApiError::Forbidden);
    }
    Ok(post)
}

/// Replaces the text of a post; owner and timestamp never change.
pub fn edit_post<S: KvStore>(store: &S, editor: &User, post_id: &str, text: &str) -> Result<Post, ApiError> {
    let mut post = owned_post(store, editor, post_id)?;
    check_length(text)?;

    post.text = text.to_string();
    store.set_json(&post_key(&post.id), &post)?;

    tracing::info!(post_id = %post.id, "post edited");
    Ok(post)
}

pub fn toggle_like<S: KvStore>(store: &S, user: &User, post_id: &str) -> Result<LikeOutcome, ApiError> {
    let post = get_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let outcome = store.update_json(&likes_key(&post.id), |likes: &mut Likes| {
        let liked = if likes.contains(&user.id) {
            likes.retain(|id| id != &user.id);
            false
        } else {
            likes.push(user.id.clone());
            true
        };
        LikeOutcome {
            likes: likes.len(),
            liked,
        }
    })?;

    tracing::info!(post_id = %post.id, user_id = %user.id, liked = outcome.liked, "like toggled");
    Ok(outcome)
}

pub fn build_post_view<S: KvStore>(store: &S, post: &Post) -> anyhow::Result<PostView> {
    let likes = get_likes(store, &post.id)?;
    build_post_view_with_likes(store, post, &likes)
}

/// Same as [`build_post_view`] for callers that already loaded the like set.
pub fn build_post_view_with_likes<S: KvStore>(store: &S, post: &Post, likes: &[String]) -> anyhow::Result<PostView> {
    let author = get_user(store, &post.user_id)?
        .map(|u| u.username)
        .unwrap_or_default();

    Ok(PostView {
        id: post.id.clone(),
        user: author,
        user_id: post.user_id.clone(),
        text: post.text.clone(),
        timestamp: format_timestamp(&post.created_at),
        likes: usernames(store, likes)?,
    })
}

// === HTTP Handlers ===

fn post_text(req: &Request) -> Result<String, ApiError> {
    let fields = read_fields(req)?;
    fields
        .get("text")
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("text is required".to_string()))
}

pub fn handle_create_post<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let user = match current_user(store, req)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let created = post_text(req).and_then(|text| create_post(store, &user, &text));
    match created {
        Ok(post) => json_response(
            201,
            &serde_json::json!({
                "message": "Post created successfully.",
                "post": build_post_view(store, &post)?,
            }),
        ),
        Err(e) => Ok(e.into()),
    }
}

pub fn handle_edit_post<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let user = match current_user(store, req)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path_id(req.path(), "/posts/");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    // Ownership is settled before the body is read
    let edited = owned_post(store, &user, post_id)
        .and_then(|_| post_text(req))
        .and_then(|text| edit_post(store, &user, post_id, &text));
    match edited {
        Ok(post) => json_response(
            201,
            &serde_json::json!({
                "message": "Post updated successfully.",
                "post": build_post_view(store, &post)?,
            }),
        ),
        Err(e) => Ok(e.into()),
    }
}

pub fn handle_like<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let user = match current_user(store, req)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path_id(req.path(), "/like/");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    match toggle_like(store, &user, post_id) {
        Ok(outcome) => {
            let message = if outcome.liked {
                "Post liked successfully."
            } else {
                "Post unliked successfully."
            };
            json_response(
                201,
                &serde_json::json!({
                    "message": message,
                    "likes": outcome.likes,
                    "liked": outcome.liked,
                }),
            )
        }
        Err(e) => Ok(e.into()),
    }
}
