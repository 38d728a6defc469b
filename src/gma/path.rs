#![forbid(unsafe_code)]

use std::path::{Component, Path, PathBuf};

use crate::gma::error::{GmaError, GmaResult};

/// Entry name for `file_path` relative to `input_root`, with forward slashes.
pub fn normalize_rel_path(input_root: &Path, file_path: &Path) -> GmaResult<String> {
    let rel = file_path
        .strip_prefix(input_root)
        .map_err(|_| GmaError::Outside(file_path.to_string_lossy().into_owned()))?;

    let mut out = String::new();
    for (i, comp) in rel.components().enumerate() {
        if i != 0 {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }

    out = out.replace('\\', "/");
    while out.starts_with('/') {
        out.remove(0);
    }

    if out.is_empty() {
        return Err(GmaError::Outside(file_path.to_string_lossy().into_owned()));
    }

    Ok(out)
}

/// Where entry `name` lands under `root` when extracted.
///
/// Names that would escape `root` (`..`, absolute paths, drive prefixes) are refused.
pub fn output_path(root: &Path, name: &str) -> GmaResult<PathBuf> {
    let mut out = root.to_path_buf();
    let mut pushed = false;
    for part in name.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        let mut comps = Path::new(part).components();
        match (comps.next(), comps.next()) {
            (Some(Component::Normal(c)), None) => {
                out.push(c);
                pushed = true;
            }
            _ => return Err(GmaError::Outside(name.to_string())),
        }
    }
    if !pushed {
        return Err(GmaError::Outside(name.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_uses_forward_slashes() {
        let root = Path::new("/addon");
        let file = root.join("materials").join("foo").join("bar.vtf");
        assert_eq!(
            normalize_rel_path(root, &file).unwrap(),
            "materials/foo/bar.vtf"
        );
    }

    #[test]
    fn file_outside_root_is_refused() {
        let err = normalize_rel_path(Path::new("/addon"), Path::new("/other/x.lua"));
        assert!(matches!(err, Err(GmaError::Outside(_))));
    }

    #[test]
    fn root_itself_is_refused() {
        let err = normalize_rel_path(Path::new("/addon"), Path::new("/addon"));
        assert!(matches!(err, Err(GmaError::Outside(_))));
    }

    #[test]
    fn output_path_follows_entry_name() {
        let root = Path::new("out");
        assert_eq!(
            output_path(root, "lua/autorun/init.lua").unwrap(),
            root.join("lua").join("autorun").join("init.lua")
        );
    }

    #[test]
    fn output_path_refuses_traversal() {
        let root = Path::new("out");
        assert!(output_path(root, "../etc/passwd").is_err());
        assert!(output_path(root, "lua/../../x").is_err());
        assert!(output_path(root, "").is_err());
        assert!(output_path(root, "//").is_err());
    }
}
