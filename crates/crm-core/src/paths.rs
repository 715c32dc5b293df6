//! Virtual folder paths for documents.
//!
//! A document's `path` is the directory it lives in. Stored paths always
//! start and end with `/`; the root is `/`.

use crate::errors::ValidationError;

pub const ROOT: &str = "/";

/// Normalize a directory path for storage.
///
/// `""` and `"/"` both become `"/"`, a missing leading or trailing slash is
/// added, and runs of slashes collapse. Normalizing twice is a no-op.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return ROOT.to_string();
    }
    let mut out = String::with_capacity(path.len() + 2);
    out.push('/');
    for segment in segments {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Whether `path` is already in stored form.
#[must_use]
pub fn is_normalized(path: &str) -> bool {
    normalize_path(path) == path
}

/// Directory path of the folder named `name` inside `parent`.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    let mut out = normalize_path(parent);
    out.push_str(name.trim_matches('/'));
    out.push('/');
    normalize_path(&out)
}

/// Parent directory of `path`, or `None` for the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .rfind('/')
        .map(|idx| normalize_path(&trimmed[..=idx]))
}

/// Immediate child segment of `current` that leads toward `descendant`.
///
/// Returns `None` when `descendant` is `current` itself or not below it.
/// Both inputs are expected in stored form.
#[must_use]
pub fn next_segment<'a>(current: &str, descendant: &'a str) -> Option<&'a str> {
    let rest = descendant.strip_prefix(current)?;
    let segment = rest.split('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Check that `name` can be used as a single folder segment.
pub fn validate_segment(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("document", "folder name is required")
            .with_fields(["name"]));
    }
    if trimmed.contains('/') {
        return Err(
            ValidationError::new("document", "folder name must not contain '/'")
                .with_fields(["name"]),
        );
    }
    if trimmed == "." || trimmed == ".." {
        return Err(ValidationError::new(
            "document",
            format!("'{trimmed}' is not a valid folder name"),
        )
        .with_fields(["name"]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "/")]
    #[case("/", "/")]
    #[case("/a", "/a/")]
    #[case("a", "/a/")]
    #[case("a/b", "/a/b/")]
    #[case("//a///b//", "/a/b/")]
    #[case("/a/b/", "/a/b/")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("/a")]
    #[case("x//y")]
    fn normalizing_twice_is_noop(#[case] input: &str) {
        let once = normalize_path(input);
        assert_eq!(normalize_path(&once), once);
        assert!(is_normalized(&once));
    }

    #[test]
    fn child_and_parent() {
        assert_eq!(child_path("/", "a"), "/a/");
        assert_eq!(child_path("/a/", "b"), "/a/b/");
        assert_eq!(parent_path("/a/b/").as_deref(), Some("/a/"));
        assert_eq!(parent_path("/a/").as_deref(), Some("/"));
        assert_eq!(parent_path("/"), None);
    }

    #[rstest]
    #[case("/a/", "/a/b/", Some("b"))]
    #[case("/a/", "/a/b/c/", Some("b"))]
    #[case("/", "/a/", Some("a"))]
    #[case("/a/", "/a/", None)]
    #[case("/a/", "/ab/", None)]
    #[case("/a/", "/", None)]
    fn next_segment_cases(
        #[case] current: &str,
        #[case] descendant: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(next_segment(current, descendant), expected);
    }

    #[test]
    fn segment_validation() {
        assert!(validate_segment("Contracts").is_ok());
        assert!(validate_segment("  ").is_err());
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("..").is_err());
    }
}
