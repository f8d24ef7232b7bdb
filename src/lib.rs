pub mod auth;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod models;
pub mod posts;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

use spin_sdk::http::{Method, Request, Response};

use crate::core::errors::ApiError;
use crate::core::store::KvStore;

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        Method::Head => "HEAD",
        Method::Options => "OPTIONS",
        Method::Patch => "PATCH",
        _ => "OTHER",
    }
}

fn is_known_route(path: &str) -> bool {
    matches!(path, "/" | "/login" | "/logout" | "/register" | "/posts" | "/following")
        || ["/posts/", "/profile/", "/like/", "/follow/", "/users/"]
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// Routes one request against `store`. Shared by the Spin component and the
/// native actix host; never fails, errors become JSON responses.
pub fn handle_request<S: KvStore>(store: &S, req: &Request) -> Response {
    let method = method_name(req.method());
    let path = req.path().to_string();

    let result = match (method, path.as_str()) {
        ("GET", "/") => feed::index(store, req),
        ("POST", "/login") => auth::login_user(store, req),
        ("GET" | "POST", "/logout") => auth::logout_user(store, req),
        ("POST", "/register") => auth::register(store, req),
        ("POST", "/posts") => posts::handle_create_post(store, req),
        ("PUT", p) if p.starts_with("/posts/") => posts::handle_edit_post(store, req),
        ("GET", p) if p.starts_with("/profile/") => feed::profile(store, req),
        ("PUT", p) if p.starts_with("/like/") => posts::handle_like(store, req),
        ("PUT", p) if p.starts_with("/follow/") => follow::handle_follow(store, req),
        ("GET", "/following") => feed::following(store, req),
        ("GET", p) if p.starts_with("/users/") => users::get_user_details(store, p),
        (_, p) if is_known_route(p) => {
            Ok(ApiError::MethodNotAllowed(format!("{} not allowed on {}", method, p)).into())
        }
        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    };

    result.unwrap_or_else(|e| {
        tracing::error!(method, path = %path, error = %e, "request failed");
        ApiError::InternalError("Internal server error".to_string()).into()
    })
}

#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: Request) -> anyhow::Result<impl spin_sdk::http::IntoResponse> {
    let store = spin_sdk::key_value::Store::open_default()?;
    Ok(handle_request(&store, &req))
}
