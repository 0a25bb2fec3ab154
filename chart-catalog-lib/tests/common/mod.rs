#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chart_catalog_core::{ChartFormat, ChartMetadata, ChartParser, ParseError};
use chart_catalog_lib::Catalog;

/// Marker line that makes [`StubParser`] reject a file.
pub const BROKEN: &str = "#BROKEN";

/// Reads `#TITLE`, `#SUBTITLE`, `#ARTIST` and `#GENRE` header lines and counts
/// how often it was invoked.
#[derive(Default)]
pub struct StubParser {
    calls: AtomicUsize,
}

impl StubParser {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChartParser for StubParser {
    fn parse(&self, path: &Path) -> Result<ChartMetadata, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(path)?;
        if text.contains(BROKEN) {
            return Err(ParseError::malformed("broken marker"));
        }
        let format = ChartFormat::from_path(path)
            .ok_or_else(|| ParseError::unsupported(path.display().to_string()))?;
        let mut meta = ChartMetadata::new(format);
        for line in text.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "#TITLE" => meta.title = value.to_string(),
                "#SUBTITLE" => meta.title2 = value.to_string(),
                "#ARTIST" => meta.artist = value.to_string(),
                "#GENRE" => meta.genre = value.to_string(),
                _ => {}
            }
        }
        Ok(meta)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An in-memory catalog with two import workers, plus its parser.
pub fn catalog() -> (Catalog, Arc<StubParser>) {
    init_logging();
    let parser = Arc::new(StubParser::default());
    let catalog = Catalog::open_in_memory(parser.clone(), 2).unwrap();
    (catalog, parser)
}

/// Write a chart file with the given title; returns its path.
pub fn write_chart(dir: &Path, name: &str, title: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, format!("#TITLE {title}\n#ARTIST Someone\n#GENRE Techno\n")).unwrap();
    path
}

pub fn mkdir(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    dir.to_path_buf()
}
