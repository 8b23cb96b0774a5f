use serde::{Deserialize, Serialize};

use quill_store::{AppEntry, CodecResult, FieldMap, FieldValue};
use quill_types::{AgentId, EntryRef};

use crate::error::{BlogError, BlogResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub name: String,
    pub content: String,
    pub author: AgentId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub content: String,
    /// The post this comment belongs to, by action or by content.
    pub post_ref: EntryRef,
    pub author: AgentId,
}

/// Link types the blog writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkTypes {
    PostToComments,
}

impl LinkTypes {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostToComments => "post_to_comments",
        }
    }
}

fn require_text(entry: &'static str, field: &str, value: &str) -> BlogResult<()> {
    if value.trim().is_empty() {
        return Err(BlogError::Invalid {
            entry,
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

impl Post {
    pub fn validate(&self) -> BlogResult<()> {
        require_text(Self::ENTRY_TYPE, "name", &self.name)?;
        require_text(Self::ENTRY_TYPE, "content", &self.content)
    }
}

impl Comment {
    pub fn validate(&self) -> BlogResult<()> {
        require_text(Self::ENTRY_TYPE, "content", &self.content)
    }
}

impl AppEntry for Post {
    const ENTRY_TYPE: &'static str = "post";

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("name", FieldValue::Text(self.name.clone()))
            .with("content", FieldValue::Text(self.content.clone()))
            .with("author", FieldValue::Agent(self.author))
    }

    fn from_fields(fields: &FieldMap) -> CodecResult<Self> {
        Ok(Self {
            name: fields.text("name")?.clone(),
            content: fields.text("content")?.clone(),
            author: *fields.agent("author")?,
        })
    }
}

impl AppEntry for Comment {
    const ENTRY_TYPE: &'static str = "comment";

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("content", FieldValue::Text(self.content.clone()))
            .with("post_ref", FieldValue::Ref(self.post_ref))
            .with("author", FieldValue::Agent(self.author))
    }

    fn from_fields(fields: &FieldMap) -> CodecResult<Self> {
        Ok(Self {
            content: fields.text("content")?.clone(),
            post_ref: *fields.entry_ref("post_ref")?,
            author: *fields.agent("author")?,
        })
    }
}
