//! Navigation operations implementation
//!
//! Path resolution works on virtual paths only: absolute, `/`-separated,
//! never ending in `/` except for the root itself.

use crate::constants::PATH_CAPACITY;
use crate::error::{NavigateError, PathError};
use crate::storage::FileSystem;
use crate::utils::BoundedString;

/// Absolute virtual path bounded by `PATH_CAPACITY`.
pub type VirtualPath = BoundedString<PATH_CAPACITY>;

/// The root path `/`.
pub fn root() -> VirtualPath {
    let mut path = VirtualPath::new();
    // A single byte always fits.
    let _ = path.push('/');
    path
}

/// Builds the absolute path named by `arg` relative to `cwd`.
///
/// An empty argument or `/` is the root, an argument starting with `/` is
/// already absolute, anything else is appended to `cwd`. Trailing
/// separators are dropped. The result must stay shorter than
/// `PATH_CAPACITY` bytes.
pub fn resolve(cwd: &str, arg: &str) -> Result<VirtualPath, PathError> {
    if arg.is_empty() || arg == "/" {
        return Ok(root());
    }

    let mut path = VirtualPath::new();
    if !arg.starts_with('/') {
        path.push_str(cwd)?;
        if !cwd.ends_with('/') {
            path.push('/')?;
        }
    }
    path.push_str(arg)?;

    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.len() >= PATH_CAPACITY {
        return Err(PathError::TooLong {
            capacity: PATH_CAPACITY,
        });
    }
    Ok(path)
}

/// Parent of `path`, or `None` when the parent is the root or `path` is
/// the root itself.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) if idx > 0 => Some(&trimmed[..idx]),
        _ => None,
    }
}

/// Directory that would contain `path`; `/` for top-level names.
pub fn containing_dir(path: &str) -> &str {
    parent(path).unwrap_or("/")
}

/// Resolves `target` and checks that it names a directory.
pub fn change_directory<F: FileSystem>(
    fs: &F,
    cwd: &str,
    target: &str,
) -> Result<VirtualPath, NavigateError> {
    let path = resolve(cwd, target)?;
    if !fs.is_dir(&path) {
        return Err(NavigateError::DirectoryNotFound(target.to_string()));
    }
    Ok(path)
}

/// Moves one segment up. Lands on the root when `cwd` is already the root
/// or the parent no longer exists.
pub fn change_to_parent<F: FileSystem>(fs: &F, cwd: &str) -> VirtualPath {
    parent(cwd)
        .filter(|up| fs.exists(up))
        .and_then(|up| VirtualPath::try_from_str(up).ok())
        .unwrap_or_else(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_separator_resolve_to_root() {
        for cwd in ["/", "/a", "/a/b/c"] {
            assert_eq!(resolve(cwd, "").unwrap(), "/");
            assert_eq!(resolve(cwd, "/").unwrap(), "/");
        }
    }

    #[test]
    fn relative_arguments_join_the_working_directory() {
        assert_eq!(resolve("/", "docs").unwrap(), "/docs");
        assert_eq!(resolve("/docs", "a.txt").unwrap(), "/docs/a.txt");
        assert_eq!(resolve("/docs", "sub/").unwrap(), "/docs/sub");
    }

    #[test]
    fn absolute_arguments_ignore_the_working_directory() {
        assert_eq!(resolve("/docs", "/etc/x").unwrap(), "/etc/x");
        assert_eq!(resolve("/docs", "/etc/").unwrap(), "/etc");
    }

    #[test]
    fn resolution_is_idempotent_on_absolute_results() {
        for (cwd, arg) in [("/", "a/b/"), ("/x", "y"), ("/x/y", "/abs/path/")] {
            let once = resolve(cwd, arg).unwrap();
            let twice = resolve(cwd, &once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn overlong_result_is_an_error() {
        let long = "n".repeat(PATH_CAPACITY);
        assert_eq!(
            resolve("/dir", &long),
            Err(PathError::TooLong {
                capacity: PATH_CAPACITY
            })
        );
        let fits = "n".repeat(PATH_CAPACITY - 2);
        assert_eq!(resolve("/", &fits).unwrap().len(), PATH_CAPACITY - 1);
    }

    #[test]
    fn result_must_stay_below_capacity() {
        let exact = "n".repeat(PATH_CAPACITY - 1);
        assert_eq!(
            resolve("/", &exact),
            Err(PathError::TooLong {
                capacity: PATH_CAPACITY
            })
        );
        // A trailing separator is dropped before the length check.
        let trailing = format!("{}/", "n".repeat(PATH_CAPACITY - 2));
        assert!(resolve("/", &trailing).is_ok());
    }

    #[test]
    fn parent_pops_one_segment() {
        assert_eq!(parent("/a/b/c"), Some("/a/b"));
        assert_eq!(parent("/a"), None);
        assert_eq!(parent("/"), None);
        assert_eq!(containing_dir("/a"), "/");
        assert_eq!(containing_dir("/a/b"), "/a");
    }
}
