use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of titles and slugs.
pub const MAX_TITLE_LEN: usize = 200;

/// Validate a slug: non-empty, at most 200 chars, only `[a-z0-9_-]`.
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("invalid slug: must not be empty".to_string());
    }
    if slug.len() > MAX_TITLE_LEN {
        return Err(format!(
            "invalid slug: longer than {MAX_TITLE_LEN} characters"
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(format!(
            "invalid slug: {slug}. use lowercase letters, digits, '-' or '_'"
        ));
    }
    Ok(())
}

/// Validate a title and return it trimmed.
pub fn clean_title(title: &str) -> Result<String, String> {
    let t = title.trim();
    if t.is_empty() {
        return Err("invalid title: must not be empty".to_string());
    }
    if t.chars().count() > MAX_TITLE_LEN {
        return Err(format!(
            "invalid title: longer than {MAX_TITLE_LEN} characters"
        ));
    }
    Ok(t.to_string())
}

/// Derive a slug from a title: lowercase ASCII alphanumerics, runs of anything
/// else collapsed to a single `-`.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c == '_' || c == '-' || c.is_whitespace() || c.is_ascii_punctuation() {
            pending_dash = true;
        }
    }
    out.truncate(MAX_TITLE_LEN);
    out
}

/// The registered item variants a `Content` row may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Text,
    File,
    Image,
    Video,
}

/// Registered content type tags.
pub const VALID_ITEM_KINDS: &[&str] = &["text", "file", "image", "video"];

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::File => "file",
            ItemKind::Image => "image",
            ItemKind::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ItemKind::Text),
            "file" => Ok(ItemKind::File),
            "image" => Ok(ItemKind::Image),
            "video" => Ok(ItemKind::Video),
            _ => Err(format!(
                "invalid content type: {s}. valid types: {}",
                VALID_ITEM_KINDS.join(", ")
            )),
        }
    }

    /// Table holding items of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            ItemKind::Text => "texts",
            ItemKind::File => "files",
            ItemKind::Image => "images",
            ItemKind::Video => "videos",
        }
    }

    /// Column holding the variant-specific payload.
    pub fn body_column(&self) -> &'static str {
        match self {
            ItemKind::Text => "content",
            ItemKind::File => "file",
            ItemKind::Image => "image",
            ItemKind::Video => "url",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Variant-specific payload of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemBody {
    Text { content: String },
    File { file: String },
    Image { image: String },
    Video { url: String },
}

impl ItemBody {
    /// Build a body of the given kind from its single payload value.
    pub fn new(kind: ItemKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            ItemKind::Text => ItemBody::Text { content: value },
            ItemKind::File => ItemBody::File { file: value },
            ItemKind::Image => ItemBody::Image { image: value },
            ItemKind::Video => ItemBody::Video { url: value },
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemBody::Text { .. } => ItemKind::Text,
            ItemBody::File { .. } => ItemKind::File,
            ItemBody::Image { .. } => ItemKind::Image,
            ItemBody::Video { .. } => ItemKind::Video,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ItemBody::Text { content } => content,
            ItemBody::File { file } => file,
            ItemBody::Image { image } => image,
            ItemBody::Video { url } => url,
        }
    }

    /// Check the payload for the kind's constraints.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ItemBody::Text { .. } => Ok(()),
            ItemBody::File { file } if file.trim().is_empty() => {
                Err("invalid file: path must not be empty".to_string())
            }
            ItemBody::Image { image } if image.trim().is_empty() => {
                Err("invalid image: path must not be empty".to_string())
            }
            ItemBody::Video { url } => {
                if url.starts_with("http://") || url.starts_with("https://") {
                    Ok(())
                } else {
                    Err(format!("invalid url: {url}"))
                }
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Number of courses in this subject, filled by listings.
    #[serde(default)]
    pub total_courses: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub owner: String,
    pub subject_id: i64,
    pub title: String,
    pub slug: String,
    pub overview: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
}

/// Join row attaching an item of any registered kind to a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub module_id: i64,
    pub content_type: ItemKind,
    pub object_id: i64,
    pub order: i64,
}

/// A concrete item: the shared base fields plus its variant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: ItemBody,
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        self.body.kind()
    }
}

/// A content row together with its resolved item (`None` when dangling).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDetail {
    #[serde(flatten)]
    pub content: Content,
    pub item: Option<Item>,
}

/// A module with its contents resolved, as shown in a course outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutline {
    #[serde(flatten)]
    pub module: Module,
    pub contents: Vec<ContentDetail>,
}

/// A course with its subject and every module's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub subject: Option<Subject>,
    pub modules: Vec<ModuleOutline>,
}

/// One entry of a module formset submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub delete: bool,
}

impl ModuleForm {
    /// An extra form the user left untouched.
    pub fn is_blank(&self) -> bool {
        self.id.is_none() && self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}
