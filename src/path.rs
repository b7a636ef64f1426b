//! Path helpers for the archive's forward-slash convention.
//!
//! ZIP entry names always use `/`, whatever the host uses. Every key stored
//! in or looked up against an archive index goes through [`normalize`].

/// Replace every backslash with a forward slash.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join two paths and normalize the result.
///
/// Segments are joined with `/`, `.` segments are dropped and `..` pops the
/// previous segment, like a host `path.join`. A trailing separator on the
/// last non-empty argument is preserved, which is how callers ask for a
/// directory prefix: `join("a", "/")` is `"a/"`.
pub fn join(a: &str, b: &str) -> String {
    let a = normalize(a);
    let b = normalize(b);
    let joined = match (a.is_empty(), b.is_empty()) {
        (true, true) => return ".".to_string(),
        (true, false) => b,
        (false, true) => a,
        (false, false) => format!("{a}/{b}"),
    };

    let absolute = joined.starts_with('/');
    let trailing = joined.ends_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(p) if *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let mut out = String::with_capacity(joined.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&parts.join("/"));
    if out.is_empty() {
        out.push('.');
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Key used against the archive index: normalized, relative to the archive
/// root (leading separators and `./` prefixes removed).
pub(crate) fn entry_key(path: &str) -> String {
    let normalized = normalize(path);
    let mut rest = normalized.as_str();
    loop {
        if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        } else if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else {
            break;
        }
    }
    if rest == "." {
        rest = "";
    }
    rest.to_string()
}

/// Last non-empty segment of a slash-separated path.
pub(crate) fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_backslashes() {
        assert_eq!(normalize(r"a\b\c.txt"), "a/b/c.txt");
        assert_eq!(normalize("a/b"), "a/b");
    }

    #[test]
    fn join_like_host() {
        assert_eq!(join("a", "b.txt"), "a/b.txt");
        assert_eq!(join("a", "/"), "a/");
        assert_eq!(join("/a", "/"), "/a/");
        assert_eq!(join(r"dir\sub", "../x"), "dir/x");
        assert_eq!(join("/archive.zip", "./lib/index.js"), "/archive.zip/lib/index.js");
        assert_eq!(join("", "/"), "/");
        assert_eq!(join("", ""), ".");
        assert_eq!(join("..", "a"), "../a");
    }

    #[test]
    fn entry_keys_are_root_relative() {
        assert_eq!(entry_key("/a/b.txt"), "a/b.txt");
        assert_eq!(entry_key(r"\a\b"), "a/b");
        assert_eq!(entry_key("./a/"), "a/");
        assert_eq!(entry_key("/"), "");
        assert_eq!(entry_key("."), "");
    }

    #[test]
    fn base_names() {
        assert_eq!(base_name("a/b.txt"), "b.txt");
        assert_eq!(base_name("a/c/"), "c");
        assert_eq!(base_name("top"), "top");
    }
}
