//! `TextChunker` (`spec.md` §4.4): splits a script into chunks no estimated
//! token count of which exceeds a cap, greedily packing sentences and, when
//! a single sentence is too long, words.

use domain::chunk::{ChunkPlan, TextChunk};

/// Tokens are approximated as `ceil(len / 3)` throughout (`spec.md` §4.4).
fn estimate_tokens(s: &str) -> usize {
    (s.len() + 2) / 3
}

/// Splits `text` into sentences on `.`, `!`, `?`, trimming whitespace and
/// discarding empties. The terminator is kept on the sentence it ends.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }
    let trailing = current.trim().to_string();
    if !trailing.is_empty() {
        sentences.push(trailing);
    }
    sentences
}

/// Greedy word-packing used when a single sentence exceeds the character
/// budget (`spec.md` §4.4 step 3). A lone word over budget is emitted
/// unsplit, as its own chunk.
fn split_words(sentence: &str, max_chars: usize) -> Vec<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in words {
        let projected_len = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };

        if projected_len <= max_chars || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn ensure_terminal_punctuation(s: &str) -> String {
    if s.ends_with(['.', '!', '?']) {
        s.to_string()
    } else {
        format!("{s}.")
    }
}

/// Produces a `ChunkPlan` for `text` with a per-chunk token cap of `token_cap`
/// (default 200 per `spec.md` §4.4).
pub fn plan(text: &str, token_cap: usize) -> ChunkPlan {
    let max_chars = token_cap * 3;
    let sentences = split_sentences(text);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if sentence.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            for word_chunk in split_words(&sentence, max_chars) {
                chunks.push(word_chunk);
            }
            continue;
        }

        let projected_len = if current.is_empty() {
            sentence.len()
        } else {
            current.len() + 1 + sentence.len()
        };

        if projected_len <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(&sentence);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    let chunks = chunks
        .into_iter()
        .map(|text| {
            let text = ensure_terminal_punctuation(&text);
            let estimated_tokens = estimate_tokens(&text);
            TextChunk { text, estimated_tokens }
        })
        .collect();

    ChunkPlan { chunks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_short_sentence_yields_one_chunk() {
        let p = plan("Hello there.", 200);
        assert_eq!(p.len(), 1);
        assert_eq!(p.chunks[0].text, "Hello there.");
    }

    #[test]
    fn every_chunk_respects_the_token_cap() {
        let text = "A sentence. ".repeat(200);
        let p = plan(&text, 50);
        assert!(p.chunks.iter().all(|c| c.estimated_tokens <= 50));
    }

    #[test]
    fn chunks_are_terminated_with_punctuation() {
        let p = plan("No terminator here", 200);
        assert!(p.chunks[0].text.ends_with('.'));
    }

    #[test]
    fn an_oversized_sentence_is_split_on_words() {
        // 2001 characters, well over a 200-token (600-char) cap, no internal punctuation.
        let long_sentence = "word ".repeat(400) + ".";
        let p = plan(&long_sentence, 200);
        assert!(p.len() > 1);
        assert!(p.chunks.iter().all(|c| c.estimated_tokens <= 200));
    }

    #[test]
    fn a_single_word_longer_than_the_cap_is_not_split() {
        let word = "x".repeat(601);
        let p = plan(&word, 200);
        assert_eq!(p.len(), 1);
        assert!(p.chunks[0].text.starts_with(&word));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let p = plan("", 200);
        assert!(p.is_empty());
    }

    #[test]
    fn concatenation_preserves_all_non_whitespace_content() {
        let text = "First sentence. Second sentence! Third one?";
        let p = plan(text, 200);
        let joined: String = p.chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>().join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&joined), normalize(text));
    }
}
