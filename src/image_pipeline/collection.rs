//! Directory listing of FITS images with their header metadata.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::{FitsReader, FrameType, HeaderValue, ImageHeader};

/// File extensions picked up by [`ImageCollection::scan`].
pub const DEFAULT_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

#[derive(Debug, Clone)]
pub struct CollectionEntry {
    pub path: PathBuf,
    pub header: ImageHeader,
    /// `(rows, cols)`
    pub shape: (usize, usize),
}

impl CollectionEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn frame_type(&self) -> Option<FrameType> {
        self.header.get_str("IMAGETYP").map(FrameType::from_imagetyp)
    }

    fn matches_keyword(&self, key: &str, wanted: &str) -> bool {
        match self.header.get(key) {
            Some(HeaderValue::Text(text)) => text.trim().eq_ignore_ascii_case(wanted.trim()),
            Some(number) => match (number.as_f64(), wanted.trim().parse::<f64>()) {
                (Some(have), Ok(want)) => (have - want).abs() <= 1e-9 * want.abs().max(1.0),
                _ => false,
            },
            None => false,
        }
    }
}

/// One line of the collection summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub file: String,
    pub imagetyp: Option<String>,
    pub exptime: Option<f64>,
    pub filter: Option<String>,
    pub rows: usize,
    pub cols: usize,
    pub biassec: Option<String>,
}

/// FITS files found in one directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct ImageCollection {
    location: PathBuf,
    entries: Vec<CollectionEntry>,
    skipped: Vec<(PathBuf, String)>,
}

impl ImageCollection {
    pub fn scan<R: FitsReader + ?Sized>(dir: impl AsRef<Path>, reader: &R) -> Result<Self> {
        Self::scan_with_extensions(dir, reader, DEFAULT_EXTENSIONS)
    }

    /// Reads the header of every regular file in `dir` whose extension is in
    /// `extensions` (case-insensitive). Files whose header cannot be read are
    /// logged and listed in [`skipped`](Self::skipped).
    pub fn scan_with_extensions<R: FitsReader + ?Sized>(
        dir: impl AsRef<Path>,
        reader: &R,
        extensions: &[&str],
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let read_error =
            |e: std::io::Error| CalibrationError::InputReadError(format!("{}: {}", dir.display(), e));

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            let wanted = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
            if wanted && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut entries = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for path in paths {
            match reader.read_header(&path) {
                Ok(info) => {
                    debug!("{}: {}x{}", path.display(), info.shape.0, info.shape.1);
                    entries.push(CollectionEntry {
                        path,
                        header: info.header,
                        shape: info.shape,
                    });
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    skipped.push((path, e.to_string()));
                }
            }
        }

        info!(
            location = %dir.display(),
            images = entries.len(),
            skipped = skipped.len(),
            "Scanned image collection"
        );

        Ok(Self {
            location: dir.to_path_buf(),
            entries,
            skipped,
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[(PathBuf, String)] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter_frame_type(&self, frame_type: &FrameType) -> Vec<&CollectionEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.frame_type().as_ref() == Some(frame_type))
            .collect()
    }

    /// Entries whose `key` equals `value`: case-insensitive for text, numeric otherwise.
    pub fn filter_keyword(&self, key: &str, value: &str) -> Vec<&CollectionEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.matches_keyword(key, value))
            .collect()
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        self.entries
            .iter()
            .map(|entry| SummaryRow {
                file: entry.file_name(),
                imagetyp: entry.header.get_str("IMAGETYP").map(str::to_string),
                exptime: entry
                    .header
                    .get_f64("EXPTIME")
                    .or_else(|| entry.header.get_f64("EXPOSURE")),
                filter: entry.header.get_str("FILTER").map(str::to_string),
                rows: entry.shape.0,
                cols: entry.shape.1,
                biassec: entry.header.get_str("BIASSEC").map(str::to_string),
            })
            .collect()
    }

    pub fn render_summary_table(&self) -> String {
        let rows = self.summary();
        let name_width = rows
            .iter()
            .map(|row| row.file.len())
            .max()
            .unwrap_or(0)
            .max("FILE".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<12} {:>9} {:<8} {:>11}  {}",
            "FILE", "IMAGETYP", "EXPTIME", "FILTER", "SHAPE", "BIASSEC",
        );
        let _ = writeln!(out, "{}", "-".repeat(name_width + 62));
        for row in &rows {
            let exptime = row
                .exptime
                .map(|t| format!("{t:.3}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<name_width$}  {:<12} {:>9} {:<8} {:>11}  {}",
                row.file,
                row.imagetyp.as_deref().unwrap_or("-"),
                exptime,
                row.filter.as_deref().unwrap_or("-"),
                format!("{}x{}", row.rows, row.cols),
                row.biassec.as_deref().unwrap_or("-"),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::fits::{CcdImage, HeaderInfo};
    use tempfile::tempdir;

    /// Serves headers keyed by file stem; files named `broken*` fail.
    struct StubReader;

    impl FitsReader for StubReader {
        fn read_image(&self, _path: &Path) -> Result<CcdImage> {
            unreachable!("collections only read headers")
        }

        fn read_header(&self, path: &Path) -> Result<HeaderInfo> {
            let stem = path.file_stem().unwrap().to_string_lossy().to_string();
            if stem.starts_with("broken") {
                return Err(CalibrationError::UnsupportedFormat("stub".to_string()));
            }
            let mut header = ImageHeader::new();
            let (kind, exptime) = stem.split_once('_').unwrap();
            header.set("IMAGETYP", kind.to_string());
            header.set("EXPTIME", exptime.parse::<f64>().unwrap());
            Ok(HeaderInfo {
                header,
                shape: (10, 12),
            })
        }
    }

    fn populated_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for name in [
            "bias_0.fits",
            "Bias_0.FIT",
            "dark_30.fits",
            "object_30.fts",
            "broken_1.fits",
            "notes_1.txt",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub_0.fits")).unwrap();
        dir
    }

    #[test]
    fn test_scan_picks_fits_extensions_and_skips_unreadable() {
        let dir = populated_dir();
        let collection = ImageCollection::scan(dir.path(), &StubReader).unwrap();

        let names: Vec<String> = collection.entries().iter().map(|e| e.file_name()).collect();
        assert_eq!(names, vec!["Bias_0.FIT", "bias_0.fits", "dark_30.fits", "object_30.fts"]);
        assert_eq!(collection.skipped().len(), 1);
        assert_eq!(collection.location(), dir.path());
    }

    #[test]
    fn test_filter_by_frame_type_and_keyword() {
        let dir = populated_dir();
        let collection = ImageCollection::scan(dir.path(), &StubReader).unwrap();

        assert_eq!(collection.filter_frame_type(&FrameType::Bias).len(), 2);
        assert_eq!(collection.filter_frame_type(&FrameType::Light).len(), 1);
        assert_eq!(collection.filter_frame_type(&FrameType::Flat).len(), 0);

        assert_eq!(collection.filter_keyword("imagetyp", "BIAS").len(), 2);
        assert_eq!(collection.filter_keyword("EXPTIME", "30").len(), 2);
        assert_eq!(collection.filter_keyword("FILTER", "R").len(), 0);
    }

    #[test]
    fn test_summary_table_lists_every_entry() {
        let dir = populated_dir();
        let collection = ImageCollection::scan(dir.path(), &StubReader).unwrap();

        let summary = collection.summary();
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[2].imagetyp.as_deref(), Some("dark"));
        assert_eq!(summary[2].exptime, Some(30.0));

        let table = collection.render_summary_table();
        assert_eq!(table.lines().count(), 2 + 4);
        assert!(table.contains("10x12"));
    }

    #[test]
    fn test_missing_directory_is_input_error() {
        let dir = tempdir().unwrap();
        let result = ImageCollection::scan(dir.path().join("absent"), &StubReader);
        assert!(matches!(result, Err(CalibrationError::InputReadError(_))));
    }
}
