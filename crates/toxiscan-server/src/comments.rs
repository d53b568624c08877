//! Video comment extraction
//!
//! Comments are fetched through the [`CommentSource`] trait so the analysis
//! route does not care whether they come from an extraction service or from
//! files on disk.

use crate::security::{validate_service_url, SecurityError, UrlValidationConfig};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

const VIDEO_ID_LEN: usize = 11;

/// A comment as returned by a comment source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, alias = "cid")]
    pub comment_id: String,

    pub text: String,

    #[serde(default)]
    pub author: String,

    #[serde(default, alias = "votes", deserialize_with = "lenient_count")]
    pub likes: u64,

    #[serde(default)]
    pub time: String,

    #[serde(default, alias = "replies", deserialize_with = "lenient_count")]
    pub reply_count: u64,
}

/// Accept a number, a numeric string or anything else as zero
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => {
            let s = s.trim().replace(',', "");
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0)
        }
        _ => 0,
    })
}

/// Order in which comments are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Top,
    Time,
    Relevance,
}

impl CommentSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentSort::Top => "top",
            CommentSort::Time => "time",
            CommentSort::Relevance => "relevance",
        }
    }
}

/// Comment extraction errors
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment service URL rejected: {0}")]
    InvalidServiceUrl(#[from] SecurityError),

    #[error("comment service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("comment service returned status {0}")]
    Status(u16),

    #[error("malformed comment payload: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of video comments
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Fetch at most `max_comments` comments for a video
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_comments: usize,
        sort: CommentSort,
    ) -> Result<Vec<Comment>, CommentError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Either a bare list or an object wrapping one
#[derive(Deserialize)]
#[serde(untagged)]
enum CommentsPayload {
    List(Vec<Comment>),
    Wrapped { comments: Vec<Comment> },
}

impl CommentsPayload {
    fn into_comments(self) -> Vec<Comment> {
        match self {
            CommentsPayload::List(comments) => comments,
            CommentsPayload::Wrapped { comments } => comments,
        }
    }
}

/// Fetches comments from an external extraction service
///
/// Calls `GET {base_url}/videos/{video_id}/comments?limit=N&sort_by=S`.
pub struct HttpCommentSource {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpCommentSource {
    pub fn new(base_url: &str, allow_insecure: bool) -> Result<Self, CommentError> {
        let validation = if allow_insecure {
            UrlValidationConfig::insecure()
        } else {
            UrlValidationConfig::default()
        };
        let base_url = validate_service_url(base_url, &validation)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base_url, client })
    }

    fn comments_url(&self, video_id: &str) -> String {
        format!(
            "{}/videos/{}/comments",
            self.base_url.as_str().trim_end_matches('/'),
            video_id
        )
    }
}

#[async_trait]
impl CommentSource for HttpCommentSource {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_comments: usize,
        sort: CommentSort,
    ) -> Result<Vec<Comment>, CommentError> {
        let url = self.comments_url(video_id);
        debug!(url = %url, max_comments, "Fetching comments");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("limit", max_comments.to_string()),
                ("sort_by", sort.as_str().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(CommentError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let payload: CommentsPayload =
            serde_json::from_str(&body).map_err(|e| CommentError::Malformed(e.to_string()))?;

        let mut comments = payload.into_comments();
        comments.truncate(max_comments);
        Ok(comments)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Reads comments from `{dir}/{video_id}.json`
pub struct FileCommentSource {
    dir: PathBuf,
}

impl FileCommentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CommentSource for FileCommentSource {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_comments: usize,
        sort: CommentSort,
    ) -> Result<Vec<Comment>, CommentError> {
        if !is_valid_video_id(video_id) {
            return Ok(Vec::new());
        }

        let path = self.dir.join(format!("{}.json", video_id));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No comment file at {:?}", path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let payload: CommentsPayload =
            serde_json::from_str(&content).map_err(|e| CommentError::Malformed(e.to_string()))?;
        let mut comments = payload.into_comments();

        if sort == CommentSort::Top {
            comments.sort_by(|a, b| b.likes.cmp(&a.likes));
        }
        comments.truncate(max_comments);
        Ok(comments)
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Leading video ID of a path segment or query value
fn leading_video_id(candidate: &str) -> Option<String> {
    let prefix = candidate.get(..VIDEO_ID_LEN)?;
    is_valid_video_id(prefix).then(|| prefix.to_string())
}

/// Extract the 11-character video ID from a YouTube URL or a bare ID.
///
/// Accepts `youtube.com/watch?v=ID` (with `v` anywhere in the query),
/// `youtu.be/ID` and `youtube.com/embed/ID`, with or without a scheme.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if is_valid_video_id(input) {
        return Some(input.to_string());
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    match host {
        "youtu.be" => url
            .path_segments()?
            .next()
            .and_then(leading_video_id),
        "youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .and_then(|(_, value)| leading_video_id(&value)),
                Some("embed") => segments.next().and_then(leading_video_id),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_video_id_forms() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"),
            id
        );
        assert_eq!(extract_video_id("youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), id);
    }

    #[test]
    fn test_extract_video_id_rejects() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("not a video"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/channel/abc"), None);
    }

    #[test]
    fn test_lenient_counts() {
        let json = r#"[
            {"comment_id": "a", "text": "one", "likes": 12, "reply_count": "3"},
            {"cid": "b", "text": "two", "votes": "1,204", "replies": null},
            {"text": "three", "likes": "1.2K"}
        ]"#;
        let comments: Vec<Comment> = serde_json::from_str(json).unwrap();
        assert_eq!(comments[0].likes, 12);
        assert_eq!(comments[0].reply_count, 3);
        assert_eq!(comments[1].comment_id, "b");
        assert_eq!(comments[1].likes, 1204);
        assert_eq!(comments[1].reply_count, 0);
        assert_eq!(comments[2].likes, 0);
        assert_eq!(comments[2].author, "");
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"comments": [
            {"comment_id": "1", "text": "first", "likes": 1},
            {"comment_id": "2", "text": "second", "likes": 50},
            {"comment_id": "3", "text": "third", "likes": 7}
        ]}"#;
        std::fs::write(dir.path().join("dQw4w9WgXcQ.json"), json).unwrap();

        let source = FileCommentSource::new(dir.path());
        let top = source
            .fetch_comments("dQw4w9WgXcQ", 2, CommentSort::Top)
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].comment_id, "2");
        assert_eq!(top[1].comment_id, "3");

        let by_time = source
            .fetch_comments("dQw4w9WgXcQ", 10, CommentSort::Time)
            .await
            .unwrap();
        assert_eq!(by_time[0].comment_id, "1");

        let missing = source
            .fetch_comments("aaaaaaaaaaa", 10, CommentSort::Top)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_malformed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.json"), "{oops").unwrap();
        let source = FileCommentSource::new(dir.path());
        let err = source
            .fetch_comments("dQw4w9WgXcQ", 10, CommentSort::Top)
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::Malformed(_)));
    }

    #[test]
    fn test_http_source_validates_url() {
        assert!(matches!(
            HttpCommentSource::new("http://localhost:9000", false),
            Err(CommentError::InvalidServiceUrl(_))
        ));
        let source = HttpCommentSource::new("http://localhost:9000/", true).unwrap();
        assert_eq!(
            source.comments_url("dQw4w9WgXcQ"),
            "http://localhost:9000/videos/dQw4w9WgXcQ/comments"
        );
    }
}
