use serde_json::{Map, Value};

/// Extracted CV sections, filled progressively by status fragments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedProfile {
    sections: Map<String, Value>,
}

impl ExtractedProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: every key in `fragment` replaces the stored section,
    /// keys absent from `fragment` are kept. Returns the number of keys written.
    pub fn merge(&mut self, fragment: &Map<String, Value>) -> usize {
        for (key, value) in fragment {
            self.sections.insert(key.clone(), value.clone());
        }
        fragment.len()
    }

    pub fn get(&self, section: &str) -> Option<&Value> {
        self.sections.get(section)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.sections.clone())
    }
}

impl From<Map<String, Value>> for ExtractedProfile {
    fn from(sections: Map<String, Value>) -> Self {
        Self { sections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_keeps_sections_missing_from_later_fragments() {
        let mut profile = ExtractedProfile::new();
        profile.merge(&object(json!({"personal_info": {"name": "Ada"}})));
        profile.merge(&object(json!({"skills": ["Rust"]})));

        assert_eq!(profile.len(), 2);
        assert_eq!(profile.get("personal_info"), Some(&json!({"name": "Ada"})));
    }

    #[test]
    fn merge_is_shallow_and_later_values_win() {
        let mut profile = ExtractedProfile::new();
        profile.merge(&object(json!({"personal_info": {"name": "Ada", "email": "a@x.io"}})));
        profile.merge(&object(json!({"personal_info": {"phone": "123"}})));

        assert_eq!(profile.get("personal_info"), Some(&json!({"phone": "123"})));
    }

    #[test]
    fn empty_fragment_changes_nothing() {
        let mut profile = ExtractedProfile::from(object(json!({"skills": ["Go"]})));
        assert_eq!(profile.merge(&Map::new()), 0);
        assert_eq!(profile.to_json(), json!({"skills": ["Go"]}));
    }
}
