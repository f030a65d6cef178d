//! Unique temporary filename generation.

use crate::error::Result;
use std::path::PathBuf;

/// mkstemp-style knobs for [`unique_filename`].
#[derive(Debug, Clone, Default)]
pub struct TempOptions {
    /// Directory to create the name in; system temp dir when unset.
    pub dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

/// Returns a path that is guaranteed not to have existed at creation time.
///
/// The file is atomically created, then removed before returning, so only
/// the name survives. Removal is best-effort: if it fails, the caller still
/// gets a path that was unique when created. No exclusivity guarantee
/// outlives the call; a concurrent process may reuse the name.
pub fn unique_filename(options: &TempOptions) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    if let Some(prefix) = &options.prefix {
        builder.prefix(prefix);
    }
    if let Some(suffix) = &options.suffix {
        builder.suffix(suffix);
    }

    let file = match &options.dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    let path = file.path().to_path_buf();

    // Dropping the handle removes the file; removal errors are swallowed.
    drop(file);

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn returns_distinct_nonexistent_paths() {
        let mut seen = HashSet::new();
        for _ in 0..20 {
            let path = unique_filename(&TempOptions::default()).unwrap();
            assert!(!path.exists());
            assert!(seen.insert(path));
        }
    }

    #[test]
    fn honors_prefix_and_suffix() {
        let options = TempOptions {
            dir: None,
            prefix: Some("geotestkit-".to_string()),
            suffix: Some(".tif".to_string()),
        };
        let path = unique_filename(&options).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("geotestkit-"));
        assert!(name.ends_with(".tif"));
    }

    #[test]
    fn honors_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = TempOptions {
            dir: Some(dir.path().to_path_buf()),
            prefix: None,
            suffix: None,
        };
        let path = unique_filename(&options).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
    }
}
