//! Resolution of relative import specifiers to absolute module locations
//!
//! Resolution is purely lexical: the importer's directory is joined with the
//! specifier and `.`/`..` segments are folded away. Nothing here touches the
//! filesystem, so the same inputs always produce the same location.

use std::path::{Component, Path, PathBuf};

use log::trace;

use crate::error::{BundleError, BundleResult};

/// Whether a specifier is relative to the importing module (`./x`, `../x`)
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Resolve `specifier`, as written inside the module at `importer`, to the
/// location of the imported module
///
/// Bare package names and absolute paths are rejected with
/// [`BundleError::UnsupportedSpecifier`].
pub fn resolve_specifier(importer: &Path, specifier: &str) -> BundleResult<PathBuf> {
    if !is_relative_specifier(specifier) {
        return Err(BundleError::UnsupportedSpecifier {
            specifier: specifier.to_owned(),
            importer: importer.to_path_buf(),
        });
    }

    let base = importer.parent().unwrap_or_else(|| Path::new(""));
    let resolved = normalize_path(&base.join(specifier));
    trace!(
        "Resolved '{specifier}' from {} to {}",
        importer.display(),
        resolved.display()
    );
    Ok(resolved)
}

/// Lexically normalize a path
///
/// `.` segments are dropped and `..` removes the preceding segment. A `..`
/// at the root of an absolute path stays at the root; leading `..` segments of
/// a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.into_iter().map(Component::as_os_str).collect()
}

/// Make `path` absolute against `cwd` and normalize it
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_resolves_sibling_module() {
        let resolved = resolve_specifier(Path::new("/app/static/entry.js"), "./message.js").unwrap();
        assert_eq!(resolved, PathBuf::from("/app/static/message.js"));
    }

    #[test]
    fn test_resolves_parent_and_nested_segments() {
        let importer = Path::new("/app/src/pages/home.js");

        assert_eq!(
            resolve_specifier(importer, "../lib/format.js").unwrap(),
            PathBuf::from("/app/src/lib/format.js")
        );
        assert_eq!(
            resolve_specifier(importer, "./widgets/../util.js").unwrap(),
            PathBuf::from("/app/src/pages/util.js")
        );
        assert_eq!(
            resolve_specifier(importer, "../../../../outside.js").unwrap(),
            PathBuf::from("/outside.js")
        );
    }

    #[test]
    fn test_same_specifier_differs_per_importer() {
        let a = resolve_specifier(Path::new("/app/a/index.js"), "./util.js").unwrap();
        let b = resolve_specifier(Path::new("/app/b/index.js"), "./util.js").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolution_is_pure() {
        let importer = Path::new("/app/static/entry.js");
        let first = resolve_specifier(importer, "./../static/./name.js").unwrap();
        let second = resolve_specifier(importer, "./../static/./name.js").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("/app/static/name.js"));
    }

    #[test]
    fn test_rejects_bare_and_absolute_specifiers() {
        let importer = Path::new("/app/entry.js");

        for specifier in ["lodash", "@scope/pkg", "/abs/module.js", ".hidden.js"] {
            let err = resolve_specifier(importer, specifier).unwrap_err();
            assert!(
                matches!(
                    &err,
                    BundleError::UnsupportedSpecifier { specifier: s, importer: i }
                        if s == specifier && i == importer
                ),
                "unexpected error for '{specifier}': {err}"
            );
        }
    }

    #[test]
    fn test_normalize_relative_paths() {
        assert_eq!(
            normalize_path(Path::new("./static/entry.js")),
            PathBuf::from("static/entry.js")
        );
        assert_eq!(normalize_path(Path::new("../a/./b/..")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_absolutize_against_cwd() {
        let cwd = Path::new("/work/project");
        assert_eq!(
            absolutize(Path::new("./static/entry.js"), cwd),
            PathBuf::from("/work/project/static/entry.js")
        );
        assert_eq!(
            absolutize(Path::new("/elsewhere/../entry.js"), cwd),
            PathBuf::from("/entry.js")
        );
    }
}
