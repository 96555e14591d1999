//! Word-by-word delivery of a finished reply

use futures::stream::{self, Stream};

/// Split `text` into words, each carrying the whitespace that follows it
///
/// Concatenating the chunks gives back `text` exactly.
pub fn word_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut after_space = false;
    let mut seen_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            after_space = true;
            continue;
        }
        if after_space && seen_word {
            chunks.push(text[start..i].to_string());
            start = i;
        }
        seen_word = true;
        after_space = false;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks
}

/// Stream a completed reply one word at a time
pub fn stream_words(text: &str) -> impl Stream<Item = String> {
    stream::iter(word_chunks(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_stream_words() {
        let chunks: Vec<String> = stream_words("Here are  the top\nmatches").collect().await;
        assert_eq!(chunks, vec!["Here ", "are  ", "the ", "top\n", "matches"]);
    }

    #[test]
    fn test_edge_cases() {
        assert!(word_chunks("").is_empty());
        assert_eq!(word_chunks("   "), vec!["   "]);
        assert_eq!(word_chunks("  hi there "), vec!["  hi ", "there "]);
    }

    proptest! {
        #[test]
        fn prop_chunks_rebuild_text(text in "\\PC{0,80}") {
            prop_assert_eq!(word_chunks(&text).concat(), text);
        }
    }
}
