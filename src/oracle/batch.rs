use crate::config::DEFAULT_PROMPT_TEMPLATE;

/// Splits titles into bounded batches and renders each one as an oracle prompt.
#[derive(Debug, Clone)]
pub struct BatchQueryBuilder {
    batch_size: usize,
    template: String,
}

impl BatchQueryBuilder {
    /// `batch_size` is clamped to at least 1.
    pub fn new(batch_size: usize, template: impl Into<String>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            template: template.into(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Lazily partition `titles` in their given order.
    pub fn batches<'a>(&self, titles: &'a [String]) -> std::slice::Chunks<'a, String> {
        titles.chunks(self.batch_size)
    }

    pub fn render(&self, batch: &[String]) -> String {
        self.template.replace("{songs}", &batch.join("\n")).trim().to_string()
    }
}

impl Default for BatchQueryBuilder {
    fn default() -> Self {
        Self::new(20, DEFAULT_PROMPT_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titles(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Track {}", i)).collect()
    }

    #[test]
    fn partitions_in_order() {
        let builder = BatchQueryBuilder::new(3, "{songs}");
        let input = titles(7);
        let batches: Vec<&[String]> = builder.batches(&input).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![3, 3, 1]);
        let flattened: Vec<String> = batches.concat();
        assert_eq!(flattened, input);
    }

    #[test]
    fn zero_size_is_clamped() {
        let builder = BatchQueryBuilder::new(0, "{songs}");
        assert_eq!(builder.batch_size(), 1);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let builder = BatchQueryBuilder::default();
        assert_eq!(builder.batches(&[]).count(), 0);
    }

    #[test]
    fn default_prompt_lists_titles_and_asks_for_abstention() {
        let builder = BatchQueryBuilder::default();
        let prompt = builder.render(&["Artist - One".to_string(), "Artist - Two".to_string()]);

        assert!(prompt.contains("Artist - One\nArtist - Two"));
        assert!(prompt.contains("Track Name:"));
        assert!(prompt.contains("Key:"));
        assert!(prompt.contains("BPM:"));
        assert!(prompt.contains("Only include entries you are confident about"));
        assert!(!prompt.contains("{songs}"));
    }
}
