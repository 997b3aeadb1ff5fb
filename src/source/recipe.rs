//! Recipe JSON records.
//!
//! Each file holds one recipe. Only `text` and `ingredients` are required;
//! `id`, `split`, `verb` and `ingredient_list` feed the record key and the
//! vocabulary. Any other key (`events`, `ing_type`, `ingredients_nocoref`, ...)
//! is accepted and ignored.

use crate::error::RecordError;
use crate::models::{EntityRef, Record};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder verb for steps without a state change.
const NO_CHANGE_VERB: &str = "<NO_CHANGE>";

#[derive(Debug, Deserialize)]
struct RawRecipe {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    split: Option<String>,
    #[serde(default)]
    text: Option<BTreeMap<String, StepText>>,
    #[serde(default)]
    ingredients: Option<BTreeMap<String, Vec<EntityRef>>>,
    #[serde(default)]
    verb: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    ingredient_list: Option<Vec<String>>,
}

/// Step text is normally a token list; older dumps store the raw sentence.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepText {
    Tokens(Vec<String>),
    Raw(String),
}

impl StepText {
    fn into_tokens(self) -> Vec<String> {
        match self {
            StepText::Tokens(tokens) => tokens,
            StepText::Raw(text) => text.split_whitespace().map(String::from).collect(),
        }
    }
}

/// Orders step keys numerically when they are numbers ("2" before "10").
fn step_order(key: &str) -> (Option<u64>, &str) {
    (key.parse().ok(), key)
}

/// Parse one recipe file into a [`Record`].
///
/// `fallback_id` is used when the file carries no `id` key.
pub fn parse_recipe(bytes: &[u8], fallback_id: &str) -> Result<Record, RecordError> {
    let raw: RawRecipe = serde_json::from_slice(bytes)?;

    let text = raw.text.ok_or_else(|| RecordError::missing("text"))?;
    let ingredients = raw
        .ingredients
        .ok_or_else(|| RecordError::missing("ingredients"))?;

    let mut step_texts: Vec<(String, Vec<String>)> = text
        .into_iter()
        .map(|(step, utt)| (step, utt.into_tokens()))
        .collect();
    step_texts.sort_by(|a, b| step_order(&a.0).cmp(&step_order(&b.0)));

    let id = match raw.id {
        Some(Value::String(id)) => id,
        Some(Value::Null) | None => fallback_id.to_string(),
        Some(other) => other.to_string(),
    };

    let verbs = raw
        .verb
        .unwrap_or_default()
        .into_values()
        .flatten()
        .filter(|verb| verb != NO_CHANGE_VERB)
        .collect();

    Ok(Record {
        id,
        split: raw.split,
        step_texts,
        step_entities: ingredients,
        verbs,
        nouns: raw.ingredient_list.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_recipe() {
        let json = br#"{"text": {"0": ["mix","flour"], "1": ["add","water"]}, "ingredients": {"0": [0]}}"#;
        let record = parse_recipe(json, "recipe-1").unwrap();

        assert_eq!(record.id, "recipe-1");
        assert_eq!(record.step_texts.len(), 2);
        assert_eq!(record.step_texts[0].1, vec!["mix", "flour"]);
        assert_eq!(
            record.step_entities.get("0"),
            Some(&vec![EntityRef::Index(0)])
        );
        assert!(record.split.is_none());
    }

    #[test]
    fn test_parse_full_recipe() {
        let json = br#"{
            "split": "train",
            "id": "r42",
            "verb": {"0": ["chop"], "1": ["<NO_CHANGE>"], "2": ["fry", "stir"]},
            "ingredient_list": ["onion", "oil"],
            "ingredients": {"0": [0], "2": [0, 1]},
            "events": {"0": {"shape": "separated"}},
            "ing_type": {"0": 1},
            "ingredients_nocoref": {"0": [0]},
            "text": {"0": ["chop", "the", "onion"], "1": ["wait"], "2": ["fry", "it"]}
        }"#;
        let record = parse_recipe(json, "ignored").unwrap();

        assert_eq!(record.id, "r42");
        assert_eq!(record.split.as_deref(), Some("train"));
        assert_eq!(record.verbs, vec!["chop", "fry", "stir"]);
        assert_eq!(record.nouns, vec!["onion", "oil"]);
    }

    #[test]
    fn test_missing_text_is_rejected() {
        let err = parse_recipe(br#"{"ingredients": {}}"#, "x").unwrap_err();
        assert_eq!(err, RecordError::MissingField("text".to_string()));
    }

    #[test]
    fn test_missing_ingredients_is_rejected() {
        let err = parse_recipe(br#"{"text": {"0": ["a"]}}"#, "x").unwrap_err();
        assert_eq!(err, RecordError::MissingField("ingredients".to_string()));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_recipe(b"{\"text\": ", "x").unwrap_err();
        assert!(matches!(err, RecordError::Parse(_)));

        let err = parse_recipe(br#"{"text": {"0": 5}, "ingredients": {}}"#, "x").unwrap_err();
        assert!(matches!(err, RecordError::Parse(_)));
    }

    #[test]
    fn test_raw_string_step_is_split_on_whitespace() {
        let json = br#"{"text": {"0": "whisk  the eggs"}, "ingredients": {}}"#;
        let record = parse_recipe(json, "x").unwrap();
        assert_eq!(record.step_texts[0].1, vec!["whisk", "the", "eggs"]);
    }

    #[test]
    fn test_steps_sorted_numerically() {
        let json = br#"{"text": {"10": ["c"], "2": ["b"], "0": ["a"]}, "ingredients": {}}"#;
        let record = parse_recipe(json, "x").unwrap();
        let keys: Vec<_> = record.step_texts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["0", "2", "10"]);
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let json = br#"{"id": 17, "text": {}, "ingredients": {}}"#;
        assert_eq!(parse_recipe(json, "x").unwrap().id, "17");
    }
}
