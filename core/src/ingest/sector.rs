use std::ops::Range;

use regex::Regex;

use crate::{
    chunking::{ChunkData, Chunker, ChunkerError},
    store::UNKNOWN_SOURCE,
};

/// How much text goes into a single chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// One chunk per contiguous run of text between sector headers.
    #[default]
    Block,
    /// Each run is further split on blank lines.
    Paragraph,
}

/// Splits text on `[SECTOR: <label>]` headers.
///
/// Text before the first header is labeled [`UNKNOWN_SOURCE`]. Each header sets the
/// label for the text that follows it, up to the next header. A header must fit on one
/// line; the label is everything after `SECTOR:` up to the closing bracket, trimmed, and
/// may be empty. Chunks are trimmed of surrounding whitespace and whitespace-only runs
/// produce no chunk.
#[derive(Debug, Clone)]
pub struct SectorChunker {
    granularity: Granularity,
    header: Regex,
    paragraph_break: Regex,
}

impl SectorChunker {
    pub fn new(granularity: Granularity) -> Result<Self, ChunkerError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ChunkerError::Configuration(e.to_string()))
        };
        Ok(Self {
            granularity,
            header: compile(r"\[SECTOR:.*?\]")?,
            paragraph_break: compile(r"\n\s*\n")?,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn push_run(&self, source_text: &str, run: Range<usize>, label: &str, out: &mut Vec<ChunkData>) {
        match self.granularity {
            Granularity::Block => push_trimmed(source_text, run, label, out),
            Granularity::Paragraph => {
                let mut start = run.start;
                for brk in self.paragraph_break.find_iter(&source_text[run.clone()]) {
                    push_trimmed(source_text, start..run.start + brk.start(), label, out);
                    start = run.start + brk.end();
                }
                push_trimmed(source_text, start..run.end, label, out);
            }
        }
    }
}

impl Chunker for SectorChunker {
    fn chunk(&self, source_text: &str) -> Result<Vec<ChunkData>, ChunkerError> {
        let mut chunks = Vec::new();
        let mut label = UNKNOWN_SOURCE;
        let mut run_start = 0;

        for header in self.header.find_iter(source_text) {
            self.push_run(source_text, run_start..header.start(), label, &mut chunks);
            label = sector_label(header.as_str());
            run_start = header.end();
        }
        self.push_run(source_text, run_start..source_text.len(), label, &mut chunks);

        Ok(chunks)
    }
}

fn sector_label(header: &str) -> &str {
    header
        .strip_prefix("[SECTOR:")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or_default()
        .trim()
}

fn push_trimmed(source_text: &str, range: Range<usize>, label: &str, out: &mut Vec<ChunkData>) {
    let slice = &source_text[range.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let start = range.start + (slice.len() - slice.trim_start().len());
    out.push(ChunkData {
        text_range: start..start + trimmed.len(),
        source: label.to_string(),
    });
}
