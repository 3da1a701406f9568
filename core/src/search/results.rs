use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// What kind of results a search returns, as far as highlighting goes
pub trait ResultsType {
    /// Highlighting section for the request, or `None` when these results
    /// are not highlighted. `extra_fields` are per-field options collected
    /// on the search context.
    fn highlighting_configuration(
        &self,
        extra_fields: &BTreeMap<String, Value>,
    ) -> Option<Map<String, Value>>;
}

/// Results highlighted on a fixed list of fields
#[derive(Debug, Clone)]
pub struct FieldsResultsType {
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
}

impl FieldsResultsType {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldsResultsType {
            fields: fields.into_iter().map(Into::into).collect(),
            pre_tag: "<span class=\"searchmatch\">".to_string(),
            post_tag: "</span>".to_string(),
        }
    }
}

impl ResultsType for FieldsResultsType {
    fn highlighting_configuration(
        &self,
        extra_fields: &BTreeMap<String, Value>,
    ) -> Option<Map<String, Value>> {
        if self.fields.is_empty() && extra_fields.is_empty() {
            return None;
        }
        let mut fields = Map::new();
        for field in &self.fields {
            fields.insert(field.clone(), json!({ "number_of_fragments": 1 }));
        }
        for (field, options) in extra_fields {
            fields.insert(field.clone(), options.clone());
        }

        let mut config = Map::new();
        config.insert("pre_tags".into(), json!([self.pre_tag]));
        config.insert("post_tags".into(), json!([self.post_tag]));
        config.insert("fields".into(), Value::Object(fields));
        Some(config)
    }
}

/// Results that never need highlighting (ids only, counts, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHighlightResultsType;

impl ResultsType for NoHighlightResultsType {
    fn highlighting_configuration(
        &self,
        _extra_fields: &BTreeMap<String, Value>,
    ) -> Option<Map<String, Value>> {
        None
    }
}
