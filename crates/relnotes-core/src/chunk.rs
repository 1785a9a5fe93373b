//! Token-budgeted text splitting with overlap.
//!
//! Token counts are estimated, not tokenizer-exact: a conservative,
//! monotonic function of whitespace-normalized character count
//! (roughly 3.5 characters per token). Overestimating is safe; blowing
//! the real backend limit is a hard provider-side error.
//!
//! Splitting prefers paragraph boundaries, then lines, then sentences,
//! then words. A chunk never cuts mid-word; a single word bigger than the
//! whole budget is emitted as its own chunk with `oversize` set.

/// Estimate the token count of `text`.
///
/// Monotonic in the whitespace-normalized character count and rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_chars(normalized_chars(text))
}

/// Character count after trimming and collapsing whitespace runs.
fn normalized_chars(text: &str) -> usize {
    let mut count = 0usize;
    let mut prev_ws = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            if !prev_ws {
                count += 1;
            }
            prev_ws = true;
        } else {
            count += 1;
            prev_ws = false;
        }
    }
    count
}

/// ceil(chars / 3.5), in integer arithmetic.
fn tokens_for_chars(chars: usize) -> usize {
    (2 * chars).div_ceil(7)
}

/// A contiguous slice of a larger text, sized to fit a backend budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    /// Length in bytes of the prefix this chunk shares with the previous
    /// one. Dropping that prefix from every non-first chunk and
    /// concatenating reconstructs the original text exactly.
    pub overlap_with_previous: usize,
    /// A single atomic unit alone exceeded the budget and was emitted
    /// whole rather than cut mid-word.
    pub oversize: bool,
    pub is_final: bool,
}

impl Chunk {
    /// The part of this chunk not shared with the previous one.
    pub fn body(&self) -> &str {
        &self.text[self.overlap_with_previous..]
    }
}

/// Boundary preference order for splitting.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits text into budget-sized chunks with configurable overlap.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    pub budget_tokens: usize,
    pub overlap_tokens: usize,
}

impl TextChunker {
    pub fn new(budget_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            budget_tokens: budget_tokens.max(1),
            overlap_tokens,
        }
    }

    /// Split `text` into chunks whose estimated size stays within the
    /// budget, each non-first chunk re-including up to `overlap_tokens`
    /// of trailing content from its predecessor.
    ///
    /// Text that already fits comes back as exactly one chunk equal to
    /// the input.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let budget = self.budget_tokens;
        if estimate_tokens(text) <= budget {
            return vec![Chunk {
                text: text.to_string(),
                index: 0,
                overlap_with_previous: 0,
                oversize: false,
                is_final: true,
            }];
        }

        // Overlap can never be allowed to eat the whole budget.
        let overlap_budget = self.overlap_tokens.min(budget / 2);

        // Segment finer than the chunk budget so each chunk packs several
        // units and the overlap carry-over has boundaries to work with.
        let unit_budget = (budget / 3).max(1);
        let mut units: Vec<&str> = Vec::new();
        segment(text, unit_budget, &SEPARATORS, &mut units);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut overlap_units: Vec<&str> = Vec::new();
        let mut overlap_acc = 0usize;
        let mut body: Vec<&str> = Vec::new();
        let mut body_acc = 0usize;

        for unit in units {
            let unit_chars = normalized_chars(unit);

            if tokens_for_chars(unit_chars) > budget {
                // Atomic unit bigger than the whole budget.
                if !body.is_empty() {
                    flush(
                        &mut chunks,
                        &mut overlap_units,
                        &mut overlap_acc,
                        &mut body,
                        &mut body_acc,
                        overlap_budget,
                    );
                }
                chunks.push(Chunk {
                    text: unit.to_string(),
                    index: chunks.len(),
                    overlap_with_previous: 0,
                    oversize: true,
                    is_final: false,
                });
                overlap_units.clear();
                overlap_acc = 0;
                continue;
            }

            if !body.is_empty()
                && tokens_for_chars(overlap_acc + body_acc + unit_chars + 1) > budget
            {
                flush(
                    &mut chunks,
                    &mut overlap_units,
                    &mut overlap_acc,
                    &mut body,
                    &mut body_acc,
                    overlap_budget,
                );
            }
            // Shed carried overlap from the front if it alone crowds the
            // unit out of the fresh chunk.
            while body.is_empty()
                && !overlap_units.is_empty()
                && tokens_for_chars(overlap_acc + unit_chars + 1) > budget
            {
                let removed = overlap_units.remove(0);
                overlap_acc -= normalized_chars(removed) + 1;
            }

            body.push(unit);
            body_acc += unit_chars + 1;
        }

        if !body.is_empty() {
            flush(
                &mut chunks,
                &mut overlap_units,
                &mut overlap_acc,
                &mut body,
                &mut body_acc,
                overlap_budget,
            );
        }
        if let Some(last) = chunks.last_mut() {
            last.is_final = true;
        }
        chunks
    }
}

/// Emit the accumulated body as a chunk and carry a trailing suffix of it
/// forward as the next chunk's overlap.
fn flush<'a>(
    chunks: &mut Vec<Chunk>,
    overlap_units: &mut Vec<&'a str>,
    overlap_acc: &mut usize,
    body: &mut Vec<&'a str>,
    body_acc: &mut usize,
    overlap_budget: usize,
) {
    let prefix: String = overlap_units.concat();
    let mut text = String::with_capacity(prefix.len() + body.iter().map(|u| u.len()).sum::<usize>());
    text.push_str(&prefix);
    for unit in body.iter() {
        text.push_str(unit);
    }
    chunks.push(Chunk {
        text,
        index: chunks.len(),
        overlap_with_previous: prefix.len(),
        oversize: false,
        is_final: false,
    });

    let mut next: Vec<&'a str> = Vec::new();
    let mut next_acc = 0usize;
    if overlap_budget > 0 {
        for unit in body.iter().rev() {
            // Never carry the whole body forward; the next chunk must make progress.
            if next.len() + 1 >= body.len() {
                break;
            }
            let chars = normalized_chars(unit);
            if tokens_for_chars(next_acc + chars + 1) > overlap_budget {
                break;
            }
            next.push(unit);
            next_acc += chars + 1;
        }
        next.reverse();
    }
    *overlap_units = next;
    *overlap_acc = next_acc;
    body.clear();
    *body_acc = 0;
}

/// Break `piece` into units that each fit the budget, preferring earlier
/// separators. Concatenating the collected units reproduces `piece`.
fn segment<'a>(piece: &'a str, budget: usize, seps: &[&str], out: &mut Vec<&'a str>) {
    if piece.is_empty() {
        return;
    }
    if estimate_tokens(piece) <= budget || seps.is_empty() {
        out.push(piece);
        return;
    }
    let parts = split_keep(piece, seps[0]);
    if parts.len() == 1 {
        segment(piece, budget, &seps[1..], out);
        return;
    }
    for part in parts {
        if estimate_tokens(part) <= budget {
            out.push(part);
        } else {
            segment(part, budget, &seps[1..], out);
        }
    }
}

/// Split on `sep`, keeping the separator attached to the preceding piece
/// so that concatenating the pieces reproduces the input exactly.
fn split_keep<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut start = 0;
    while let Some(pos) = text[start..].find(sep) {
        let end = start + pos + sep.len();
        out.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| {
                format!(
                    "Paragraph {i} opens with context. It continues with a second sentence \
                     about feature work. A third sentence closes out the thought."
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        chunks.iter().map(Chunk::body).collect()
    }

    #[test]
    fn small_text_is_a_single_identical_chunk() {
        let chunker = TextChunker::new(1000, 50);
        let text = "One short release note.";
        let chunks = chunker.split(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].overlap_with_previous, 0);
        assert!(chunks[0].is_final);
        assert!(!chunks[0].oversize);
    }

    #[test]
    fn large_text_round_trips_exactly() {
        let text = sample_text(12);
        let chunker = TextChunker::new(60, 10);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1, "expected the text to split");
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn every_chunk_respects_the_budget() {
        let text = sample_text(12);
        let chunker = TextChunker::new(60, 10);
        for chunk in chunker.split(&text) {
            assert!(!chunk.oversize);
            assert!(
                estimate_tokens(&chunk.text) <= 60,
                "chunk {} estimated at {} tokens",
                chunk.index,
                estimate_tokens(&chunk.text)
            );
        }
    }

    #[test]
    fn non_first_chunks_share_a_prefix_with_their_predecessor() {
        let text = sample_text(12);
        let chunks = TextChunker::new(60, 20).split(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.overlap_with_previous == 0 {
                continue;
            }
            let shared = &next.text[..next.overlap_with_previous];
            assert!(
                prev.text.ends_with(shared),
                "chunk {} overlap is not a suffix of chunk {}",
                next.index,
                prev.index
            );
        }
        assert!(
            chunks[1..].iter().any(|c| c.overlap_with_previous > 0),
            "expected at least one overlapping chunk"
        );
    }

    #[test]
    fn chunks_break_on_whitespace_not_mid_word() {
        let text = sample_text(12);
        let chunks = TextChunker::new(60, 10).split(&text);
        for chunk in &chunks[..chunks.len() - 1] {
            let last = chunk.text.chars().last().unwrap();
            assert!(
                last.is_whitespace(),
                "chunk {} ends mid-word: {:?}",
                chunk.index,
                &chunk.text[chunk.text.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn giant_atomic_word_is_emitted_whole_and_flagged() {
        let word = "x".repeat(400);
        let text = format!("short intro. {word} short outro.");
        let chunks = TextChunker::new(20, 4).split(&text);
        let oversize: Vec<_> = chunks.iter().filter(|c| c.oversize).collect();
        assert_eq!(oversize.len(), 1);
        assert!(oversize[0].text.contains(&word));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn indices_are_sequential_and_only_last_is_final() {
        let text = sample_text(12);
        let chunks = TextChunker::new(60, 10).split(&text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.is_final, i == chunks.len() - 1);
        }
    }

    #[test]
    fn estimate_is_monotonic_and_conservative() {
        assert_eq!(estimate_tokens(""), 0);
        let short = estimate_tokens("four score");
        let long = estimate_tokens("four score and seven years ago");
        assert!(short <= long);
        // "four score" normalizes to 10 chars -> ceil(10 / 3.5) = 3.
        assert_eq!(short, 3);
        // Whitespace runs collapse before counting.
        assert_eq!(estimate_tokens("a    b"), estimate_tokens("a b"));
    }
}
