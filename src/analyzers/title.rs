use std::path::{Path, PathBuf};
use regex::Regex;

/// Derives the query title sent to the oracle from a track's path.
///
/// Pure: the output depends only on the path and the optional scan root, so the
/// same file always produces the same title across runs.
pub struct TitleNormalizer {
    root: Option<PathBuf>,
    paren_regex: Regex,
    separator_regex: Regex,
}

impl TitleNormalizer {
    pub fn new() -> Self {
        Self {
            root: None,
            paren_regex: Regex::new(r"\s*(\([^)]*\)|\[[^\]]*\])").unwrap(),
            separator_regex: Regex::new(r"[_\s]+").unwrap(),
        }
    }

    /// Files sitting directly in `root` do not get the root's name folded in.
    pub fn with_root(root: &Path) -> Self {
        let mut normalizer = Self::new();
        normalizer.root = Some(root.to_path_buf());
        normalizer
    }

    pub fn normalize(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let parent = path
            .parent()
            .filter(|p| self.root.as_deref() != Some(*p))
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|p| !p.trim().is_empty());

        // Avoid "Artist - Artist - Song" when the stem already names the folder
        let combined = match parent {
            Some(parent) if !stem.to_lowercase().contains(&parent.to_lowercase()) => {
                format!("{} - {}", parent, stem)
            }
            _ => stem.clone(),
        };

        let stripped = self.paren_regex.replace_all(&combined, "");
        let title = self.collapse(&stripped);
        if !title.is_empty() {
            return title;
        }

        // Whole name was annotations, e.g. "(Intro).wav"
        let fallback = self.collapse(&combined);
        if !fallback.is_empty() {
            return fallback;
        }
        path.to_string_lossy().into_owned()
    }

    fn collapse(&self, text: &str) -> String {
        self.separator_regex
            .replace_all(text, " ")
            .trim()
            .trim_end_matches(" -")
            .trim()
            .to_string()
    }
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::file_ops::RenameApplier;
    use crate::KeyTag;
    use pretty_assertions::assert_eq;

    #[test]
    fn folds_in_parent_folder() {
        let normalizer = TitleNormalizer::new();
        let title = normalizer.normalize(Path::new("downloads/Artist Name/01 Song Title.m4a"));
        assert_eq!(title, "Artist Name - 01 Song Title");
    }

    #[test]
    fn skips_parent_already_in_name() {
        let normalizer = TitleNormalizer::new();
        let title = normalizer.normalize(Path::new("output/Daft Punk/Daft Punk - Around the World.wav"));
        assert_eq!(title, "Daft Punk - Around the World");
    }

    #[test]
    fn skips_scan_root() {
        let normalizer = TitleNormalizer::with_root(Path::new("/music/output"));
        let title = normalizer.normalize(Path::new("/music/output/Song Title.wav"));
        assert_eq!(title, "Song Title");
    }

    #[test]
    fn subfolder_named_like_root_is_still_folded() {
        let normalizer = TitleNormalizer::with_root(Path::new("music/output"));
        let title = normalizer.normalize(Path::new("music/output/output/Song Title.wav"));
        assert_eq!(title, "output - Song Title");
    }

    #[test]
    fn strips_tags_and_separators() {
        let normalizer = TitleNormalizer::with_root(Path::new("output"));
        let path = PathBuf::from("output/Artist_-_Song__Name_(A minor_128bpm) [Official Video].wav");
        assert_eq!(normalizer.normalize(&path), "Artist - Song Name");
    }

    #[test]
    fn retagged_name_normalizes_like_the_original() {
        let normalizer = TitleNormalizer::with_root(Path::new("output"));
        let before = normalizer.normalize(Path::new("output/Artist - Song.wav"));
        let after = normalizer.normalize(Path::new("output/Artist - Song_(A minor_128bpm).wav"));
        assert_eq!(before, after);
    }

    #[test]
    fn retagged_name_with_bracketed_key_normalizes_like_the_original() {
        let normalizer = TitleNormalizer::with_root(Path::new("output"));
        let tag = KeyTag::new("F# minor (4A) [Camelot]", Some("124"));
        let renamed = RenameApplier::destination(Path::new("output/Artist - Song.wav"), &tag).unwrap();
        assert_eq!(normalizer.normalize(&renamed), "Artist - Song");
    }

    #[test]
    fn annotation_only_name_is_not_empty() {
        let normalizer = TitleNormalizer::with_root(Path::new("output"));
        assert_eq!(normalizer.normalize(Path::new("output/(Intro).wav")), "(Intro)");
    }

    #[test]
    fn deterministic_across_instances() {
        let path = Path::new("downloads/Some Artist/track_02 (remix).opus");
        let first = TitleNormalizer::new().normalize(path);
        let second = TitleNormalizer::new().normalize(path);
        assert_eq!(first, second);
        assert_eq!(first, "Some Artist - track 02");
    }
}
