//! Normalized, handler-agnostic book metadata.

/// A book as seen by catalog consumers.
///
/// Every handler produces this shape regardless of the source format.
/// `path` is opaque: for plain files it is the filesystem path, for books
/// living inside containers it is a virtual path owned by the container
/// handler that emitted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Book {
    pub title: String,
    pub authors: Vec<Author>,
    pub genres: Vec<String>,
    pub annotation: Option<String>,
    pub sequence: Option<String>,
    /// Only meaningful together with `sequence`.
    pub sequence_number: Option<i32>,
    pub cover: Option<Cover>,
    pub path: String,
}

/// Cover image bytes with their media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cover {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A person credited as author. All name parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Author {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.push(genre.into());
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_sequence(mut self, name: impl Into<String>, number: Option<i32>) -> Self {
        self.sequence = Some(name.into());
        self.sequence_number = number;
        self
    }

    pub fn with_cover(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.cover = Some(Cover {
            data,
            content_type: content_type.into(),
        });
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Display names of all authors, in order.
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().map(Author::full_name).collect()
    }
}

impl Author {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    pub fn with_middle_name(mut self, name: impl Into<String>) -> Self {
        self.middle_name = Some(name.into());
        self
    }

    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    pub fn with_nickname(mut self, name: impl Into<String>) -> Self {
        self.nickname = Some(name.into());
        self
    }

    /// True when no name part carries any text.
    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.middle_name,
            &self.last_name,
            &self.nickname,
        ]
        .iter()
        .all(|part| present(part).is_none())
    }

    /// Deterministic display name, also used as a lookup key.
    ///
    /// Layout is `Last, First Middle (Nick)`, or `Last, Middle` when there is
    /// no first name. Separators only appear after something has been
    /// written, and the nickname loses its parentheses when it is the only
    /// populated part.
    pub fn full_name(&self) -> String {
        let mut out = String::new();

        if let Some(last) = present(&self.last_name) {
            out.push_str(last);
        }
        if let Some(first) = present(&self.first_name) {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(first);
        }
        if let Some(middle) = present(&self.middle_name) {
            if present(&self.first_name).is_some() {
                out.push(' ');
            } else if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(middle);
        }
        if let Some(nick) = present(&self.nickname) {
            if out.is_empty() {
                out.push_str(nick);
            } else {
                out.push_str(" (");
                out.push_str(nick);
                out.push(')');
            }
        }

        out.trim().to_string()
    }
}

fn present(part: &Option<String>) -> Option<&str> {
    part.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
