//! Toxiscan Server
//!
//! HTTP API for scoring YouTube comments for toxicity.
//!
//! The router is built from an [`AppState`] holding the predictor, the
//! prediction log, the metrics collector and the comment source. Each of
//! them is optional so the server can run degraded: without a model every
//! prediction route answers 503, without a prediction log the history
//! routes do.

pub mod comments;
pub mod config;
pub mod routes;
pub mod security;
pub mod state;

pub use comments::{
    extract_video_id, Comment, CommentError, CommentSort, CommentSource, FileCommentSource,
    HttpCommentSource,
};
pub use config::{CommentSourceKind, CommentsConfig, ConfigOverrides, ServerConfig};
pub use routes::{create_router, AppError};
pub use state::AppState;
