//! Helpers for `:`-delimited configuration keys

use std::cmp::Ordering;

/// Separator between the segments of a configuration path
pub const KEY_DELIMITER: char = ':';

/// Join a parent path and a child key
pub fn combine(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", parent, KEY_DELIMITER, key)
    }
}

/// The last segment of a path
pub fn section_key(path: &str) -> &str {
    match path.rfind(KEY_DELIMITER) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Everything before the last segment, if the path has more than one
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(KEY_DELIMITER).map(|pos| &path[..pos])
}

/// Case-insensitive key equality
pub fn keys_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Normalised form used for map lookups
pub fn fold(key: &str) -> String {
    key.to_ascii_lowercase()
}

/// If `key` lives under `parent`, return the remainder after `parent:`.
pub fn strip_parent<'a>(key: &'a str, parent: &str) -> Option<&'a str> {
    if parent.is_empty() {
        return Some(key);
    }
    let head = key.get(..parent.len())?;
    if !head.eq_ignore_ascii_case(parent) {
        return None;
    }
    key[parent.len()..].strip_prefix(KEY_DELIMITER)
}

/// Order keys segment by segment: numerically when both segments are
/// integers, otherwise case-insensitively.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    let mut left = a.split(KEY_DELIMITER);
    let mut right = b.split(KEY_DELIMITER);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => fold(x).cmp(&fold(y)),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_and_split() {
        assert_eq!(combine("", "a"), "a");
        assert_eq!(combine("a:b", "c"), "a:b:c");
        assert_eq!(section_key("a:b:c"), "c");
        assert_eq!(section_key("a"), "a");
        assert_eq!(parent_path("a:b:c"), Some("a:b"));
        assert_eq!(parent_path("a"), None);
    }

    #[test]
    fn test_strip_parent() {
        assert_eq!(strip_parent("Logging:Level:Default", "logging"), Some("Level:Default"));
        assert_eq!(strip_parent("LoggingX:Level", "Logging"), None);
        assert_eq!(strip_parent("Logging", "Logging"), None);
        assert_eq!(strip_parent("a:b", ""), Some("a:b"));
    }

    #[test]
    fn test_compare_keys() {
        let mut keys = vec!["b", "10", "A", "2", "a:1", "a:0"];
        keys.sort_by(|a, b| compare_keys(a, b));
        assert_eq!(keys, vec!["2", "10", "A", "a:0", "a:1", "b"]);
    }
}
