//! Per-record feature extraction.

use crate::models::{PerRecordStats, Record, Vocabulary};
use std::collections::HashMap;

/// Character length of `tokens` joined by single spaces.
fn joined_len(tokens: &[String]) -> usize {
    let chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
    chars + tokens.len().saturating_sub(1)
}

/// Derive the scalar features of one record.
///
/// Pure: the record is only read, and nothing outside the returned value is
/// touched, so records can be extracted on any thread in any order.
pub fn extract(record: &Record) -> PerRecordStats {
    let utterance_count = record.step_texts.len();
    let token_count = record.step_texts.iter().map(|(_, tokens)| tokens.len()).sum();
    let char_count = record
        .step_texts
        .iter()
        .map(|(_, tokens)| joined_len(tokens))
        .sum();

    let mut entity_frequency = HashMap::new();
    for entity in record.step_entities.values().flatten() {
        *entity_frequency.entry(entity.clone()).or_insert(0) += 1;
    }

    let vocabulary = Vocabulary {
        verbs: record.verbs.iter().cloned().collect(),
        nouns: record.nouns.iter().cloned().collect(),
    };

    PerRecordStats {
        id: record.id.clone(),
        split: record.split.clone(),
        utterance_count,
        token_count,
        char_count,
        entity_frequency,
        vocabulary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityRef;
    use crate::source::parse_recipe;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_extract_minimal_recipe() {
        let json = br#"{"text": {"0": ["mix","flour"], "1": ["add","water"]}, "ingredients": {"0": [0]}}"#;
        let stats = extract(&parse_recipe(json, "r").unwrap());

        assert_eq!(stats.utterance_count, 2);
        assert_eq!(stats.token_count, 4);
        assert_eq!(stats.entity_frequency.len(), 1);
        assert_eq!(stats.entity_frequency.get(&EntityRef::Index(0)), Some(&1));
    }

    #[test]
    fn test_token_count_ignores_step_order() {
        let mut record = Record {
            step_texts: vec![
                ("0".to_string(), tokens(&["a", "b", "c"])),
                ("1".to_string(), tokens(&["d"])),
                ("2".to_string(), tokens(&[])),
                ("3".to_string(), tokens(&["e", "f"])),
            ],
            ..Record::default()
        };
        let forward = extract(&record);
        record.step_texts.reverse();
        let backward = extract(&record);

        assert_eq!(forward.token_count, 6);
        assert_eq!(forward.token_count, backward.token_count);
        assert_eq!(forward.utterance_count, 4);
    }

    #[test]
    fn test_entity_counts_sum_to_mentions() {
        let json = br#"{
            "text": {"0": ["a"], "1": ["b"], "2": ["c"], "3": ["d"]},
            "ingredients": {"0": [0, 1], "1": [1], "3": [1, 2, 0]}
        }"#;
        let stats = extract(&parse_recipe(json, "r").unwrap());

        assert_eq!(stats.total_mentions(), 6);
        assert_eq!(stats.entity_frequency.values().sum::<usize>(), 6);
        assert_eq!(stats.unique_entities(), 3);
        assert_eq!(stats.entity_frequency.get(&EntityRef::Index(1)), Some(&3));
        assert_eq!(stats.entity_frequency.get(&EntityRef::Index(2)), Some(&1));
    }

    #[test]
    fn test_repeated_reference_in_one_step_counts_each_position() {
        let json = br#"{"text": {"0": ["x"]}, "ingredients": {"0": [4, 4, 4]}}"#;
        let stats = extract(&parse_recipe(json, "r").unwrap());
        assert_eq!(stats.entity_frequency.get(&EntityRef::Index(4)), Some(&3));
    }

    #[test]
    fn test_record_without_entities() {
        let json = br#"{"text": {"0": ["stir"]}, "ingredients": {}}"#;
        let stats = extract(&parse_recipe(json, "r").unwrap());
        assert!(stats.entity_frequency.is_empty());
        assert_eq!(stats.chain_length(), None);
    }

    #[test]
    fn test_char_count_joins_tokens_with_spaces() {
        let record = Record {
            step_texts: vec![
                ("0".to_string(), tokens(&["mix", "flour"])),
                ("1".to_string(), tokens(&["crème"])),
                ("2".to_string(), tokens(&[])),
            ],
            ..Record::default()
        };
        // "mix flour" = 9, "crème" = 5
        assert_eq!(extract(&record).char_count, 14);
    }

    #[test]
    fn test_vocabulary_is_deduplicated() {
        let record = Record {
            verbs: tokens(&["open", "close", "open"]),
            nouns: tokens(&["door", "door"]),
            ..Record::default()
        };
        let stats = extract(&record);
        assert_eq!(stats.vocabulary.verbs.len(), 2);
        assert_eq!(stats.vocabulary.nouns.len(), 1);
    }
}
