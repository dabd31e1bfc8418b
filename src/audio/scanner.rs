use std::path::{Path, PathBuf};
use crate::analyzers::title::TitleNormalizer;
use crate::{Result, TaggerError, TrackFile};

/// Enumerates audio files under a directory in a stable order.
pub struct TrackScanner {
    extensions: Vec<String>,
}

impl TrackScanner {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
        }
    }

    fn has_valid_ext(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == &ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Paths of every matching file, sorted by name within each directory.
    pub fn collect_paths(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TaggerError::InvalidPath(format!("{} is not a directory", dir.display())));
        }

        log::info!("Scanning directory structure: {}", dir.display());
        let paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Error accessing entry: {}", err);
                    None
                }
            })
            .filter(|e| {
                let is_file = e.file_type().is_file();
                let valid = is_file && self.has_valid_ext(e.path());
                if is_file && !valid {
                    log::debug!("Skipping non-audio file: {}", e.path().display());
                }
                valid
            })
            .map(|e| e.into_path())
            .collect();

        log::info!("Found {} audio files in {}", paths.len(), dir.display());
        Ok(paths)
    }

    /// Enumerate tracks and derive each display title once.
    pub fn scan(&self, dir: impl AsRef<Path>) -> Result<Vec<TrackFile>> {
        let dir = dir.as_ref();
        let normalizer = TitleNormalizer::with_root(dir);
        let tracks = self
            .collect_paths(dir)?
            .into_iter()
            .map(|path| {
                let title = normalizer.normalize(&path);
                TrackFile::new(path, title)
            })
            .collect();
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn filters_and_orders_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let artist = dir.path().join("Artist");
        fs::create_dir_all(&artist).unwrap();
        fs::write(artist.join("b.WAV"), b"").unwrap();
        fs::write(artist.join("a.wav"), b"").unwrap();
        fs::write(artist.join("cover.jpg"), b"").unwrap();
        fs::write(dir.path().join("Loose Track.wav"), b"").unwrap();

        let tracks = TrackScanner::new(&["wav".to_string()]).scan(dir.path()).unwrap();
        let titles: Vec<&str> = tracks.iter().map(|t| t.display_title.as_str()).collect();
        assert_eq!(titles, vec!["Artist - a", "Artist - b", "Loose Track"]);
    }

    #[test]
    fn missing_directory_is_error() {
        let scanner = TrackScanner::new(&["wav".to_string()]);
        assert!(scanner.scan("/definitely/not/here").is_err());
    }
}
