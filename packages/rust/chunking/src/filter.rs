//! Noise-section filter.

use papercorpus_shared::{RawSection, SectionFilterConfig};

use crate::word_count;

/// Drops sections with too few words or characters to be worth chunking,
/// such as glossaries and abbreviation lists picked up from the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionFilter {
    config: SectionFilterConfig,
}

impl SectionFilter {
    pub fn new(config: SectionFilterConfig) -> Self {
        Self { config }
    }

    /// `true` when the section should be kept.
    pub fn keep(&self, section: &RawSection) -> bool {
        let text = section.text.trim();
        word_count(text) >= self.config.min_words
            && text.chars().count() >= self.config.min_chars
    }

    /// The kept sections, in their original order.
    ///
    /// The iterator borrows only `sections`, so a temporary filter works.
    pub fn apply<'a>(
        &self,
        sections: &'a [RawSection],
    ) -> impl Iterator<Item = &'a RawSection> + 'a {
        let filter = *self;
        sections.iter().filter(move |s| filter.keep(s))
    }
}
