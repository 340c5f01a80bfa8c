use serde::{Deserialize, Serialize};

/// A PDF form field as reported by the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    #[serde(default, alias = "text_near_key")]
    pub nearby_text_hints: Vec<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            nearby_text_hints: Vec::new(),
            placeholder: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.nearby_text_hints.push(hint.into());
        self
    }
}

/// One resolution target, from either a skeleton leaf or a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetField {
    pub path: String,
    #[serde(default)]
    pub hints: Vec<String>,
    /// Skeleton leaves that already hold a value are never overwritten.
    #[serde(default)]
    pub prefilled: bool,
    /// Literal keys leading to the leaf. Empty means `path` splits on dots.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
}

impl TargetField {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hints: Vec::new(),
            prefilled: false,
            segments: Vec::new(),
        }
    }

    /// Builds a skeleton leaf from its literal keys.
    ///
    /// Keys may themselves contain dots; the joined `path` is only a label.
    pub fn from_segments(segments: Vec<String>, prefilled: bool) -> Self {
        Self {
            path: segments.join("."),
            hints: Vec::new(),
            prefilled,
            segments,
        }
    }

    /// The keys to walk when writing this target into a document.
    pub fn path_segments(&self) -> Vec<&str> {
        if self.segments.is_empty() {
            self.path.split('.').collect()
        } else {
            self.segments.iter().map(String::as_str).collect()
        }
    }
}

impl From<&FieldDescriptor> for TargetField {
    fn from(descriptor: &FieldDescriptor) -> Self {
        let mut hints = descriptor.nearby_text_hints.clone();
        if let Some(placeholder) = descriptor
            .placeholder
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            hints.push(placeholder.to_string());
        }
        Self {
            path: descriptor.key.clone(),
            hints,
            prefilled: false,
            segments: vec![descriptor.key.clone()],
        }
    }
}
