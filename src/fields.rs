// Field naming of the tag-check group in API responses.
//
// The group was renamed from `hc_*` to `data_check_*`. Decoding only knows
// the current names, so legacy objects are renamed in place first.
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagCheckFields {
    pub has_expected_tags: &'static str,
    pub expected_tags: &'static str,
    pub result_tags: &'static str,
}

impl TagCheckFields {
    fn names(&self) -> [&'static str; 3] {
        [self.has_expected_tags, self.expected_tags, self.result_tags]
    }
}

pub const DATA_CHECK_FIELDS: TagCheckFields = TagCheckFields {
    has_expected_tags: "data_check_has_expected_tags",
    expected_tags: "data_check_expected_tags",
    result_tags: "data_check_result_tags",
};

pub const LEGACY_HC_FIELDS: TagCheckFields = TagCheckFields {
    has_expected_tags: "hc_has_expected_tags",
    expected_tags: "hc_expected_tags",
    result_tags: "hc_result_tags",
};

/// Which naming the API is expected to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    #[default]
    DataCheck,
    Hc,
}

impl FieldNaming {
    pub fn fields(self) -> TagCheckFields {
        match self {
            FieldNaming::DataCheck => DATA_CHECK_FIELDS,
            FieldNaming::Hc => LEGACY_HC_FIELDS,
        }
    }
}

/// Rename the tag-check keys of `obj` to the current names.
///
/// Keys in the configured naming are always moved. Legacy `hc_*` keys are
/// moved too when the configured naming is current, so old responses still
/// decode. A key already present under its current name is left alone.
pub fn normalize_tag_check_fields(obj: &mut Map<String, Value>, naming: FieldNaming) {
    let mut sources = vec![naming.fields()];
    if naming != FieldNaming::Hc {
        sources.push(LEGACY_HC_FIELDS);
    }
    for source in sources {
        for (from, to) in source.names().into_iter().zip(DATA_CHECK_FIELDS.names()) {
            if from == to || obj.contains_key(to) {
                continue;
            }
            if let Some(value) = obj.remove(from) {
                debug!(from, to, "renaming tag-check field");
                obj.insert(to.to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn legacy_keys_are_renamed() {
        let mut obj = object(json!({
            "hc_has_expected_tags": true,
            "hc_expected_tags": {"building": "house"},
            "hc_result_tags": {"building": "house"},
        }));
        normalize_tag_check_fields(&mut obj, FieldNaming::DataCheck);
        assert_eq!(obj.get("data_check_has_expected_tags"), Some(&json!(true)));
        assert!(obj.get("data_check_expected_tags").is_some());
        assert!(obj.get("hc_result_tags").is_none());
    }

    #[test]
    fn current_keys_win_over_legacy() {
        let mut obj = object(json!({
            "data_check_has_expected_tags": false,
            "hc_has_expected_tags": true,
        }));
        normalize_tag_check_fields(&mut obj, FieldNaming::DataCheck);
        assert_eq!(obj.get("data_check_has_expected_tags"), Some(&json!(false)));
    }

    #[test]
    fn hc_naming_leaves_current_objects_untouched() {
        let mut obj = object(json!({"data_check_has_expected_tags": true}));
        normalize_tag_check_fields(&mut obj, FieldNaming::Hc);
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.get("data_check_has_expected_tags"), Some(&json!(true)));
    }
}
