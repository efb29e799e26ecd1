//! Shared tool-result types.
//!
//! A tool result is an ordered list of content blocks plus whatever other
//! fields the execution framework attached. Only `image` and `text` blocks are
//! interpreted; every other block shape is carried through as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single unit of tool output.
///
/// Serialized shapes:
/// - Image: `{"type": "image", "data": "<base64>", "mimeType": "image/png"}`
/// - Text: `{"type": "text", "text": "..."}`
/// - Other: any other JSON value, preserved verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// Declared MIME type (e.g. "image/png"). Not trusted until sniffed.
        mime_type: String,
    },
    Text {
        text: String,
    },
    /// Unrecognized block, passed through untouched.
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentBlock::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentBlock::Text { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl Serialize for ContentBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        match self {
            ContentBlock::Image { data, mime_type } => {
                let mut state = serializer.serialize_struct("ContentBlock", 3)?;
                state.serialize_field("type", "image")?;
                state.serialize_field("data", data)?;
                state.serialize_field("mimeType", mime_type)?;
                state.end()
            }
            ContentBlock::Text { text } => {
                let mut state = serializer.serialize_struct("ContentBlock", 2)?;
                state.serialize_field("type", "text")?;
                state.serialize_field("text", text)?;
                state.end()
            }
            ContentBlock::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ContentBlock::from_value(value))
    }
}

impl ContentBlock {
    /// Classifies a raw JSON block.
    ///
    /// Image and text blocks are only recognized when every field they need is
    /// a string; anything else falls back to `Other`.
    pub fn from_value(value: Value) -> Self {
        let Some(obj) = value.as_object() else {
            return ContentBlock::Other(value);
        };

        let field = |name: &str| obj.get(name).and_then(Value::as_str);

        match field("type") {
            Some("image") => {
                if let (Some(data), Some(mime_type)) = (field("data"), field("mimeType")) {
                    return ContentBlock::image(data, mime_type);
                }
            }
            Some("text") => {
                if let Some(text) = field("text") {
                    return ContentBlock::text(text);
                }
            }
            _ => {}
        }

        ContentBlock::Other(value)
    }
}

/// Result of one tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Every other field (`details`, `isError`, ...) round-trips unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolResult {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            extra: Map::new(),
        }
    }

    /// Returns a copy of this result with a different content list.
    #[must_use]
    pub fn with_content(&self, content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            extra: self.extra.clone(),
        }
    }

    /// Whether any block is an image or text block.
    pub fn has_media_or_text(&self) -> bool {
        self.content.iter().any(|b| b.is_image() || b.is_text())
    }
}
