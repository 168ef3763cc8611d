//! Cache key definitions.
//!
//! Defines `CacheKey` for stored responses, `Category` for the resource
//! families that scope invalidation, and the registry set names.

use std::fmt;

use axum::http::Uri;

/// Prefix shared by every stored response key.
pub const KEY_PREFIX: &str = "cache:";

/// Path prefix under which every cacheable resource lives.
pub const API_PREFIX: &str = "/api/";

/// Set holding every response key ever inserted.
pub const GLOBAL_REGISTRY_KEY: &str = "cache-registry:all";

const CATEGORY_REGISTRY_PREFIX: &str = "cache-registry:";

/// Resource family a cached route belongs to.
///
/// The name always matches the path segment after `/api/`, so a key can be
/// mapped back to its category registry during pattern purges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Users,
    Posts,
    Comments,
    Messages,
    Notifications,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Users => "users",
            Category::Posts => "posts",
            Category::Comments => "comments",
            Category::Messages => "messages",
            Category::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a stored response: `cache:` + path + optional `?query`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_uri(uri: &Uri) -> Self {
        match uri.query() {
            Some(query) => Self(format!("{KEY_PREFIX}{}?{query}", uri.path())),
            None => Self(format!("{KEY_PREFIX}{}", uri.path())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the registry set for a category.
pub fn category_registry_key(category: &str) -> String {
    format!("{CATEGORY_REGISTRY_PREFIX}{category}")
}

/// Resource segment of a stored key (`cache:/api/<segment>/...`).
pub fn key_category(key: &str) -> Option<&str> {
    let path = key.strip_prefix(KEY_PREFIX)?;
    let rest = path.strip_prefix(API_PREFIX)?;
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    let segment = &rest[..end];
    (!segment.is_empty()).then_some(segment)
}

/// Store-side pattern matching everything under a category or prefix.
///
/// `posts` becomes `cache:/api/posts*`; an argument that already names the
/// full `/api/...` path is only prefixed.
pub fn scan_pattern(target: &str) -> String {
    let mut pattern = if target.contains(API_PREFIX) {
        format!("{KEY_PREFIX}{target}")
    } else {
        format!("{KEY_PREFIX}{API_PREFIX}{target}")
    };
    if !pattern.ends_with('*') {
        pattern.push('*');
    }
    pattern
}

/// Single key targeted by the last-resort purge, wildcards stripped.
pub fn exact_key(target: &str) -> String {
    let stripped: String = target.chars().filter(|c| !is_wildcard(*c)).collect();
    if stripped.contains(API_PREFIX) {
        format!("{KEY_PREFIX}{stripped}")
    } else {
        format!("{KEY_PREFIX}{API_PREFIX}{stripped}")
    }
}

pub fn has_wildcard(target: &str) -> bool {
    target.chars().any(is_wildcard)
}

fn is_wildcard(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_query_string() {
        let uri: Uri = "/api/posts?page=2&limit=5".parse().unwrap();
        assert_eq!(
            CacheKey::from_uri(&uri).as_str(),
            "cache:/api/posts?page=2&limit=5"
        );
    }

    #[test]
    fn key_without_query_has_no_question_mark() {
        let uri: Uri = "/api/users/42".parse().unwrap();
        assert_eq!(CacheKey::from_uri(&uri).as_str(), "cache:/api/users/42");
    }

    #[test]
    fn key_category_reads_resource_segment() {
        assert_eq!(key_category("cache:/api/posts"), Some("posts"));
        assert_eq!(key_category("cache:/api/posts?page=1"), Some("posts"));
        assert_eq!(key_category("cache:/api/users/1/posts"), Some("users"));
        assert_eq!(key_category("cache:/health"), None);
        assert_eq!(key_category("cache:/api/"), None);
    }

    #[test]
    fn scan_pattern_prefixes_category() {
        assert_eq!(scan_pattern("posts"), "cache:/api/posts*");
        assert_eq!(scan_pattern("posts/abc*"), "cache:/api/posts/abc*");
        assert_eq!(scan_pattern("/api/users/1*"), "cache:/api/users/1*");
    }

    #[test]
    fn exact_key_strips_wildcards() {
        assert_eq!(exact_key("posts/abc*"), "cache:/api/posts/abc");
        assert_eq!(exact_key("users"), "cache:/api/users");
    }
}
