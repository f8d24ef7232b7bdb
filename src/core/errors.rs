use spin_sdk::http::Response;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid username and/or password.")]
    InvalidCredentials,
    #[error("Passwords must match.")]
    PasswordMismatch,
    #[error("Username already taken.")]
    DuplicateUsername,
    #[error("Post must be 280 characters or less.")]
    TooLong,
    #[error("You are not allowed to edit this post.")]
    Forbidden,
    #[error("You are not allowed to follow yourself.")]
    SelfFollow,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::PasswordMismatch | ApiError::TooLong => 400,
            ApiError::Unauthorized | ApiError::InvalidCredentials => 401,
            ApiError::Forbidden | ApiError::SelfFollow => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::DuplicateUsername => 409,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Response::builder()
            .status(err.status())
            .header("Content-Type", "application/json")
            .body(body.to_string().into_bytes())
            .build()
    }
}

// Storage failures surface as internal errors
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_json_with_status() {
        let resp: Response = ApiError::SelfFollow.into();
        assert_eq!(*resp.status(), 403);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "You are not allowed to follow yourself.");

        let resp: Response = ApiError::NotFound("Post not found".to_string()).into();
        assert_eq!(*resp.status(), 404);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "Post not found");
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(ApiError::TooLong.status(), 400);
        assert_eq!(ApiError::PasswordMismatch.status(), 400);
        assert_eq!(ApiError::InvalidCredentials.status(), 401);
        assert_eq!(ApiError::Forbidden.status(), 403);
        assert_eq!(ApiError::DuplicateUsername.status(), 409);
    }
}
