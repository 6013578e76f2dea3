//! Best-effort file metadata: capture date and pixel dimensions.

use chrono::{DateTime, Utc};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What the extractor could recover for one file. Every field degrades
/// independently; extraction as a whole never fails.
#[derive(Debug, Clone)]
pub struct PhotoMetadata {
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// EXIF capture time when present, else the file's modification time.
    pub capture_date: DateTime<Utc>,
}

/// Service for reading capture dates and dimensions from image files.
pub struct MetadataService;

impl MetadataService {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, path: &Path) -> PhotoMetadata {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let (width, height) = match self.dimensions(path) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        let capture_date = self
            .exif_capture_date(path)
            .unwrap_or_else(|| self.modified_time(path));

        PhotoMetadata {
            file_name,
            width,
            height,
            capture_date,
        }
    }

    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        match image::image_dimensions(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                log::warn!("could not read dimensions for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// EXIF `DateTimeOriginal`, falling back to `DateTime`. Unreadable
    /// files and files without EXIF both yield `None`.
    fn exif_capture_date(&self, path: &Path) -> Option<DateTime<Utc>> {
        let file = File::open(path).ok()?;
        let mut buf_reader = BufReader::new(file);
        let exif_reader = Reader::new().read_from_container(&mut buf_reader).ok()?;

        for tag in [Tag::DateTimeOriginal, Tag::DateTime] {
            if let Some(field) = exif_reader.get_field(tag, In::PRIMARY) {
                if let Some(datetime_str) = field_to_string(&field.value) {
                    if let Some(dt) = parse_exif_datetime(&datetime_str) {
                        return Some(dt);
                    }
                }
            }
        }
        None
    }

    fn modified_time(&self, path: &Path) -> DateTime<Utc> {
        match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(mtime) => DateTime::<Utc>::from(mtime),
            Err(e) => {
                log::warn!("no modification time for {}: {}", path.display(), e);
                Utc::now()
            }
        }
    }
}

impl Default for MetadataService {
    fn default() -> Self {
        Self::new()
    }
}

fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(vec) => vec.first().map(|ascii_val| {
            String::from_utf8_lossy(ascii_val)
                .trim_end_matches('\0')
                .to_string()
        }),
        _ => None,
    }
}

/// Parses the EXIF "YYYY:MM:DD HH:MM:SS" form (naive, assumed UTC).
fn parse_exif_datetime(datetime_str: &str) -> Option<DateTime<Utc>> {
    match chrono::NaiveDateTime::parse_from_str(datetime_str.trim(), "%Y:%m:%d %H:%M:%S") {
        Ok(dt) => Some(dt.and_utc()),
        Err(_) => {
            log::warn!("failed to parse EXIF datetime: {}", datetime_str);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2023:12:25 14:30:45").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 25);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 45);

        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn test_capture_date_falls_back_to_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plain.jpg");
        fs::write(&file_path, b"not really a jpeg").unwrap();

        let meta = MetadataService::new().extract(&file_path);

        let mtime = fs::metadata(&file_path).unwrap().modified().unwrap();
        assert_eq!(meta.capture_date, DateTime::<Utc>::from(mtime));
        assert_eq!(meta.file_name, "plain.jpg");
    }

    #[test]
    fn test_dimensions_absent_for_unreadable_image() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("broken.png");
        fs::write(&file_path, b"garbage").unwrap();

        let meta = MetadataService::new().extract(&file_path);
        assert!(meta.width.is_none());
        assert!(meta.height.is_none());
    }

    #[test]
    fn test_dimensions_for_real_image() {
        use image::{ImageBuffer, Rgb};

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("real.png");
        let img = ImageBuffer::from_fn(64, 32, |x, y| {
            let v = ((x + y) % 256) as u8;
            Rgb([v, v, v])
        });
        img.save(&file_path).unwrap();

        let meta = MetadataService::new().extract(&file_path);
        assert_eq!(meta.width, Some(64));
        assert_eq!(meta.height, Some(32));
    }

    #[test]
    fn test_missing_file_still_yields_metadata() {
        let meta = MetadataService::new().extract(Path::new("/no/such/file.jpg"));
        assert_eq!(meta.file_name, "file.jpg");
        assert!(meta.width.is_none());
        // Falls through to "now" when even mtime is unavailable.
        assert!(meta.capture_date <= Utc::now());
    }
}
