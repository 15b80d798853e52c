//! Recursive character splitter.
//!
//! Text is split on the coarsest separator present, pieces are merged greedily up to
//! `chunk_size`, and consecutive chunks carry up to `chunk_overlap` characters of shared
//! text. Lengths are counted in `char`s so multi-byte text never gets sliced mid-codepoint.
//! No chunk is ever longer than `chunk_size`.

use edu_core::domain::{Chunk, Provenance, SourceDocument};
use edu_core::error::{codes, AppError};

/// Paragraph, line, sentence, clause, word.
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", ", ", " "];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn validate_params(chunk_size: usize, chunk_overlap: usize) -> Result<(), AppError> {
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Err(AppError::new(
            codes::CONFIG_INVALID,
            "Chunking requires chunk_size > 0 and chunk_overlap < chunk_size",
        )
        .with_details(format!("chunk_size={chunk_size}; chunk_overlap={chunk_overlap}")));
    }
    Ok(())
}

/// Split a single text. Returned chunks are trimmed and never empty.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, AppError> {
    validate_params(chunk_size, chunk_overlap)?;
    Ok(split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap))
}

/// Split every document, attaching provenance and per-document ordinals.
pub fn split_documents(
    documents: &[SourceDocument],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, AppError> {
    validate_params(chunk_size, chunk_overlap)?;

    let mut out = Vec::new();
    for doc in documents {
        let source = doc.file_name();
        let mut search_from = 0usize;
        for (ordinal, text) in split_recursive(&doc.text, &SEPARATORS, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
        {
            // Chunks appear in document order; overlap means the next one can start
            // before the previous one ended, so search from the previous start.
            let offset = doc.text[search_from..]
                .find(&text)
                .map(|pos| search_from + pos)
                .unwrap_or(search_from);
            search_from = offset;

            out.push(Chunk::new(
                ordinal as u32,
                text,
                Provenance {
                    source: source.clone(),
                    path: doc.path.clone(),
                    page: doc.page,
                    offset,
                },
            ));
        }
    }
    Ok(out)
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    // Coarsest separator that actually occurs; the last one is the fallback.
    let (idx, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| text.contains(**sep))
        .map(|(i, sep)| (i, *sep))
        .unwrap_or((separators.len().saturating_sub(1), separators.last().copied().unwrap_or(" ")));
    let finer = &separators[(idx + 1).min(separators.len())..];

    let mut out = Vec::new();
    let mut small: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) <= chunk_size {
            small.push(piece);
            continue;
        }
        if !small.is_empty() {
            out.extend(merge_pieces(&small, chunk_size, chunk_overlap));
            small.clear();
        }
        if finer.is_empty() || !finer.iter().any(|s| piece.contains(*s)) {
            out.extend(hard_split(piece, chunk_size, chunk_overlap));
        } else {
            out.extend(split_recursive(piece, finer, chunk_size, chunk_overlap));
        }
    }
    if !small.is_empty() {
        out.extend(merge_pieces(&small, chunk_size, chunk_overlap));
    }
    out
}

/// Last resort for a run with no separator at all (a long URL, a formula): fixed char
/// windows that still share `chunk_overlap` characters.
fn hard_split(piece: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = piece.trim().chars().collect();
    let step = chunk_size - chunk_overlap;
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        push_trimmed(&mut out, &window);
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}

/// Split at `separator`, keeping the separator attached to the preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        result.push(&text[start..]);
    }
    result
}

/// Greedy merge; on each emitted chunk, drop leading pieces until what remains fits
/// in the overlap window and leaves room for the next piece.
fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut window: std::collections::VecDeque<(&str, usize)> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        if total + len > chunk_size && !window.is_empty() {
            let joined: String = window.iter().map(|(p, _)| *p).collect();
            push_trimmed(&mut out, &joined);

            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                match window.pop_front() {
                    Some((_, l)) => total -= l,
                    None => break,
                }
            }
        }
        window.push_back((piece, len));
        total += len;
    }

    let joined: String = window.iter().map(|(p, _)| *p).collect();
    push_trimmed(&mut out, &joined);
    out
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let t = text.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}
