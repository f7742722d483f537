//! JSON form of a project document
//!
//! `plutil -convert json project.pbxproj` produces this shape, and Xcode
//! reads it back:
//!
//! ```text
//! { "archiveVersion": "1", "objects": { ID: { "isa": ..., ... } }, "rootObject": ID, ... }
//! ```
//!
//! Top-level keys other than `objects` are carried through untouched.

use crate::error::ProjectError;
use pbx_graph::{DecodeError, Fields, ObjectId};
use serde_json::Value;

/// Top-level dictionary of a project file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Fields,
}

impl Document {
    /// Wrap a top-level dictionary
    #[inline]
    #[must_use]
    pub fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    /// Parse JSON text
    ///
    /// # Errors
    /// `InvalidData` if the text is not JSON or not a dictionary.
    pub fn parse(text: &str) -> Result<Self, ProjectError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProjectError::InvalidData(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse JSON bytes
    ///
    /// # Errors
    /// `InvalidData` if the bytes are not JSON or not a dictionary.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProjectError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProjectError::InvalidData(e.to_string()))?;
        Self::from_value(value)
    }

    /// Use an already parsed value
    ///
    /// # Errors
    /// `InvalidData` if the value is not a dictionary.
    pub fn from_value(value: Value) -> Result<Self, ProjectError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ProjectError::InvalidData(format!(
                "top level is {}, expected a dictionary",
                kind_of(&other)
            ))),
        }
    }

    /// Identifier of the root project record
    ///
    /// # Errors
    /// `InvalidDocument` if `rootObject` is absent or not a string.
    pub fn root_object(&self) -> Result<ObjectId, DecodeError> {
        self.fields
            .get("rootObject")
            .and_then(Value::as_str)
            .map(ObjectId::from)
            .ok_or(DecodeError::InvalidDocument {
                key: "rootObject".to_string(),
                expected: "a string",
            })
    }

    /// The `objects` dictionary
    ///
    /// # Errors
    /// `InvalidDocument` if `objects` is absent or not a dictionary.
    pub fn objects(&self) -> Result<&Fields, DecodeError> {
        self.fields
            .get("objects")
            .and_then(Value::as_object)
            .ok_or(DecodeError::InvalidDocument {
                key: "objects".to_string(),
                expected: "a dictionary",
            })
    }

    /// Replace the `objects` dictionary, keeping its position
    pub fn set_objects(&mut self, objects: Fields) {
        self.fields.insert("objects".to_string(), Value::Object(objects));
    }

    /// Every top-level key
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Consume into a JSON value
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Pretty JSON text with a trailing newline
    ///
    /// # Errors
    /// `InvalidData` if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ProjectError> {
        let mut text = serde_json::to_string_pretty(&self.fields)
            .map_err(|e| ProjectError::InvalidData(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a dictionary",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_sample_text() {
        let doc = Document::parse(&pbx_test_utils::sample_project_text()).unwrap();
        assert_eq!(
            doc.root_object().unwrap().as_str(),
            pbx_test_utils::ids::PROJECT
        );
        assert_eq!(doc.objects().unwrap().len(), 18);
    }

    #[test]
    fn rejects_non_dictionary() {
        let err = Document::parse("[1, 2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "data in project.pbxproj is not in the expected format: top level is a list, expected a dictionary"
        );
        assert!(matches!(Document::parse("{"), Err(ProjectError::InvalidData(_))));
    }

    #[test]
    fn missing_keys_are_decode_errors() {
        let doc = Document::from_value(json!({"objects": []})).unwrap();
        assert_eq!(
            doc.root_object(),
            Err(DecodeError::InvalidDocument {
                key: "rootObject".into(),
                expected: "a string",
            })
        );
        assert!(doc.objects().is_err());
    }

    #[test]
    fn text_round_trip_keeps_key_order() {
        let text = pbx_test_utils::sample_project_text();
        let doc = Document::parse(&text).unwrap();
        assert_eq!(doc.to_json_string().unwrap(), format!("{text}\n"));
    }
}
