//! Context serialization.
//!
//! Converts an ordered passage list into the single prompt/display string the
//! summarization and verification agents consume. The format is part of the
//! external contract and must stay byte-stable:
//! `Chunk <n> (page=<page>): <text>` joined by blank lines.

use crate::models::Passage;

pub fn serialize_passages(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "No relevant context found.".to_string();
    }

    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            let text = passage.text.replace('\n', " ");
            format!("Chunk {} (page={}): {}", i + 1, passage.page(), text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn passage(text: &str, page: &str) -> Passage {
        let mut metadata = HashMap::new();
        metadata.insert("page".to_string(), page.to_string());
        Passage {
            text: text.to_string(),
            metadata,
        }
    }

    #[test]
    fn formats_numbered_chunks_joined_by_blank_lines() {
        let passages = vec![
            passage("X is a thing.", "1"),
            passage("X does Y.", "2"),
        ];
        assert_eq!(
            serialize_passages(&passages),
            "Chunk 1 (page=1): X is a thing.\n\nChunk 2 (page=2): X does Y."
        );
    }

    #[test]
    fn collapses_newlines_and_trims() {
        let passages = vec![passage("  line one\nline two ", "3")];
        assert_eq!(
            serialize_passages(&passages),
            "Chunk 1 (page=3): line one line two"
        );
    }

    #[test]
    fn missing_page_renders_unknown() {
        let passages = vec![Passage {
            text: "no metadata here".to_string(),
            metadata: HashMap::new(),
        }];
        assert_eq!(
            serialize_passages(&passages),
            "Chunk 1 (page=unknown): no metadata here"
        );
    }

    #[test]
    fn empty_input_yields_sentinel() {
        assert_eq!(serialize_passages(&[]), "No relevant context found.");
    }

    #[test]
    fn serialization_is_deterministic() {
        let passages = vec![passage("A", "1"), passage("B", "2"), passage("C", "3")];
        let first = serialize_passages(&passages);
        let second = serialize_passages(&passages);
        assert_eq!(first, second);
    }
}
