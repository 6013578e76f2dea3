//! Recursive discovery of image files on disk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp",
];

/// Recursively walks `dir`, returning paths of supported image files in
/// walk order. Unreadable entries are skipped.
pub fn discover_images(dir: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            if IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                images.push(path.to_path_buf());
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovers_images_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("top.jpg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.PNG"), b"x").unwrap();

        let images = discover_images(dir.path());
        assert_eq!(images.len(), 2);
        assert!(images.iter().any(|p| p.ends_with("top.jpg")));
        assert!(images.iter().any(|p| p.ends_with("deep.PNG")));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover_images(dir.path()).is_empty());
    }
}
