//! Early-page text sampling.
//!
//! Policy documents put the schedule (insurer, policy number, premium,
//! dates) on the first pages. The sampler reads pages in order, keeps pages
//! dense enough to carry real content, and stops early:
//!
//! * a page with fewer than `min_words_per_page` whitespace tokens is skipped
//!   and extends the stop index by one;
//! * scanning stops after page `i` when `i` equals the stop index (initially
//!   1) or exceeds `max_scan_index`.
//!
//! A dense document is therefore read from pages 0 and 1 only, while a
//! document of sparse cover pages is scanned up to page `max_scan_index + 1`.
//! The accumulated text is capped at `max_characters` characters.
//!
//! The sampler is push-based so the PDF decoder can stop loading pages as
//! soon as [`Step::Stop`] is returned.

use crate::config::ExtractionBudget;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether the decoder should feed another page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// Text sampled from the early pages of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledText {
    /// The text handed to the LLM.
    pub text: String,
    /// Pages fed to the sampler.
    pub pages_scanned: usize,
    /// Pages dropped for having too few words.
    pub pages_skipped: usize,
    /// True when `text` was cut to the character budget.
    pub truncated: bool,
}

impl SampledText {
    /// Number of characters (not bytes) in the sampled text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of whitespace-separated words in the sampled text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Incremental page sampler.
#[derive(Debug)]
pub struct PageSampler {
    budget: ExtractionBudget,
    content: String,
    index: usize,
    stop_index: usize,
    skipped: usize,
    done: bool,
}

impl PageSampler {
    pub fn new(budget: ExtractionBudget) -> Self {
        Self {
            budget,
            content: String::new(),
            index: 0,
            stop_index: 1,
            skipped: 0,
            done: false,
        }
    }

    /// Feed the next page's text fragments in reading order.
    ///
    /// Pushing after [`Step::Stop`] has been returned is a no-op.
    pub fn push<I, S>(&mut self, fragments: I) -> Step
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.done {
            return Step::Stop;
        }

        let page_text = join_fragments(fragments);
        let words = page_text.split_whitespace().count();
        let i = self.index;

        if words < self.budget.min_words_per_page {
            self.stop_index += 1;
            self.skipped += 1;
            debug!("Page {}: {} words, skipped", i + 1, words);
        } else {
            if !self.content.is_empty() {
                self.content.push(' ');
            }
            self.content.push_str(&page_text);
            debug!("Page {}: {} words, kept", i + 1, words);
        }

        self.index += 1;
        if i == self.stop_index || i > self.budget.max_scan_index {
            self.done = true;
            Step::Stop
        } else {
            Step::Continue
        }
    }

    /// Number of pages pushed so far.
    pub fn pages_scanned(&self) -> usize {
        self.index
    }

    /// Apply the character cap and return the sample.
    pub fn finish(self) -> SampledText {
        let (text, truncated) = truncate_chars(self.content, self.budget.max_characters);
        SampledText {
            text,
            pages_scanned: self.index,
            pages_skipped: self.skipped,
            truncated,
        }
    }
}

/// Sample an already-decoded document.
pub fn sample_pages<P, I, S>(pages: P, budget: ExtractionBudget) -> SampledText
where
    P: IntoIterator<Item = I>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sampler = PageSampler::new(budget);
    for page in pages {
        if sampler.push(page) == Step::Stop {
            break;
        }
    }
    sampler.finish()
}

/// Join text fragments with a single space.
fn join_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (n, frag) in fragments.into_iter().enumerate() {
        if n > 0 {
            out.push(' ');
        }
        out.push_str(frag.as_ref());
    }
    out
}

/// Cut `s` to at most `max` characters on a char boundary.
fn truncate_chars(mut s: String, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => {
            s.truncate(byte_idx);
            (s, true)
        }
        None => (s, false),
    }
}
