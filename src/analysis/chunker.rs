use super::models::AnalysisChunk;

/// Splits text into chunks of at most `max_lines_per_chunk` lines.
///
/// Lines are the `\n`-separated segments of `content`, so joining the chunk
/// contents with `\n` gives back the input exactly. Empty input yields no
/// chunks; the last chunk may be shorter than the bound.
pub fn split_into_chunks(content: &str, max_lines_per_chunk: usize) -> Vec<AnalysisChunk> {
    if content.is_empty() {
        return Vec::new();
    }

    let max_lines = max_lines_per_chunk.max(1);
    let lines: Vec<&str> = content.split('\n').collect();

    lines
        .chunks(max_lines)
        .enumerate()
        .map(|(i, group)| AnalysisChunk {
            content: group.join("\n"),
            start_line: i * max_lines + 1,
        })
        .collect()
}

/// Number of lines as counted by the chunker.
#[must_use]
pub fn count_lines(content: &str) -> usize {
    if content.is_empty() {
        0
    } else {
        content.split('\n').count()
    }
}

/// Cuts `content` down to at most `max_bytes`, ending on a whole line.
///
/// Returns the kept prefix and whether anything was dropped. A single first
/// line longer than the cap is cut at the last char boundary that fits.
#[must_use]
pub fn truncate_to_bytes(content: &str, max_bytes: usize) -> (&str, bool) {
    if content.len() <= max_bytes {
        return (content, false);
    }

    let mut cut = max_bytes;
    while cut > 0 && !content.is_char_boundary(cut) {
        cut -= 1;
    }
    // The cap ends exactly on a line: keep it
    if content.as_bytes().get(cut) == Some(&b'\n') {
        return (&content[..cut], true);
    }
    let head = &content[..cut];

    // Keep whole lines; the newline itself belongs to the dropped tail
    match head.rfind('\n') {
        Some(idx) => (&content[..idx], true),
        None => (head, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(chunks: &[AnalysisChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_three_lines_two_per_chunk() {
        let chunks = split_into_chunks("one\ntwo\nthree", 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "one\ntwo");
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[1].content, "three");
        assert_eq!(chunks[1].start_line, 3);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_into_chunks("", 10).is_empty());
        assert_eq!(count_lines(""), 0);
    }

    #[test]
    fn test_short_file_single_chunk() {
        let chunks = split_into_chunks("fn main() {}\n", 300);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].line_count(), 2);
    }

    #[test]
    fn test_coverage_and_reconstruction() {
        let samples = [
            "a",
            "a\n",
            "\n\n\n",
            "line 1\r\nline 2\r\nline 3\r\n",
            "x\ny\nz\nw\nv\nu\nt",
            "héllo\nwörld\n日本語\n",
        ];
        for text in samples {
            for max in 1..=4 {
                let chunks = split_into_chunks(text, max);
                let total: usize = chunks.iter().map(AnalysisChunk::line_count).sum();
                assert_eq!(total, count_lines(text), "line count for {text:?} / {max}");
                assert_eq!(rejoin(&chunks), text, "rejoin for {text:?} / {max}");
                assert!(chunks.iter().all(|c| c.line_count() <= max));
            }
        }
    }

    #[test]
    fn test_start_lines_are_contiguous() {
        let text = (1..=23).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let chunks = split_into_chunks(&text, 5);
        assert_eq!(chunks.len(), 5);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].start_line + pair[0].line_count());
        }
        assert_eq!(chunks.last().unwrap().end_line(), 23);
    }

    #[test]
    fn test_zero_bound_treated_as_one() {
        let chunks = split_into_chunks("a\nb", 0);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_truncate_keeps_whole_lines() {
        let (kept, truncated) = truncate_to_bytes("aaaa\nbbbb\ncccc", 12);
        assert!(truncated);
        assert_eq!(kept, "aaaa\nbbbb");

        // cap lands right at the end of the second line
        let (kept, truncated) = truncate_to_bytes("aaaa\nbbbb\ncccc", 9);
        assert!(truncated);
        assert_eq!(kept, "aaaa\nbbbb");

        let (kept, _) = truncate_to_bytes("aaaa\nbbbb\ncccc", 8);
        assert_eq!(kept, "aaaa");

        let (kept, truncated) = truncate_to_bytes("short", 100);
        assert!(!truncated);
        assert_eq!(kept, "short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let (kept, truncated) = truncate_to_bytes("日本語", 4);
        assert!(truncated);
        assert_eq!(kept, "日");
    }
}
