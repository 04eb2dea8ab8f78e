//! Allow-list filtering for values interpolated into datastore SQL.
//!
//! Only `[A-Za-z0-9_ /]` survives. Quotes, semicolons, dashes and comment
//! markers are removed outright, so a sanitized value can never close the
//! string literal it is placed in.

use std::borrow::Cow;

pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == '/'
}

/// Strips every character outside the allow-list.
pub fn sanitize(input: &str) -> Cow<'_, str> {
    if input.chars().all(is_allowed) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.chars().filter(|c| is_allowed(*c)).collect())
    }
}

/// Sanitized value together with whether anything was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub original: String,
    pub value: String,
}

impl Sanitized {
    pub fn new(input: &str) -> Self {
        Self {
            original: input.to_string(),
            value: sanitize(input).into_owned(),
        }
    }

    pub fn was_modified(&self) -> bool {
        self.original != self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}
