//! Typed field access over a raw record
//!
//! Reference fields are retained in the store as they are read; their
//! targets are not looked up, so forward references within a document are
//! fine and existence is left to validation.

use super::Isa;
use crate::error::DecodeError;
use crate::fields::{value_as_bool, value_as_int, Fields};
use crate::handle::Handle;
use crate::id::ObjectId;
use crate::source_tree::SourceTree;
use crate::store::ObjectStore;
use serde_json::Value;

pub(crate) struct Decoder<'a> {
    id: &'a ObjectId,
    isa: Isa,
    fields: &'a Fields,
    store: &'a mut ObjectStore,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(
        id: &'a ObjectId,
        isa: Isa,
        fields: &'a Fields,
        store: &'a mut ObjectStore,
    ) -> Self {
        Self {
            id,
            isa,
            fields,
            store,
        }
    }

    pub(crate) fn isa(&self) -> Isa {
        self.isa
    }

    pub(crate) fn id(&self) -> &ObjectId {
        self.id
    }

    fn missing(&self, key: &str) -> DecodeError {
        DecodeError::FieldMissing {
            isa: self.isa.as_str().to_string(),
            id: self.id.clone(),
            key: key.to_string(),
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            isa: self.isa.as_str().to_string(),
            id: self.id.clone(),
            key: key.to_string(),
            expected,
        }
    }

    fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        let fields: &'a Fields = self.fields;
        fields.get(key).ok_or_else(|| self.missing(key))
    }

    fn id_at(&self, key: &str, value: &Value) -> Result<ObjectId, DecodeError> {
        value
            .as_str()
            .map(ObjectId::from)
            .ok_or_else(|| self.wrong_type(key, "identifier string"))
    }

    /// Raw value, if present
    pub(crate) fn value(&self, key: &str) -> Option<&'a Value> {
        let fields: &'a Fields = self.fields;
        fields.get(key)
    }

    pub(crate) fn string(&self, key: &str) -> Result<String, DecodeError> {
        self.required(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.wrong_type(key, "string"))
    }

    pub(crate) fn optional_string(&self, key: &str) -> Result<Option<String>, DecodeError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.wrong_type(key, "string")),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Result<bool, DecodeError> {
        value_as_bool(self.required(key)?).ok_or_else(|| self.wrong_type(key, "boolean"))
    }

    pub(crate) fn optional_int(&self, key: &str) -> Result<Option<i64>, DecodeError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value_as_int(value)
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, "integer")),
        }
    }

    pub(crate) fn strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        self.strings_in(key, self.required(key)?)
    }

    /// String list that may be absent, read as empty
    pub(crate) fn sparse_strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        match self.value(key) {
            None => Ok(Vec::new()),
            Some(value) => self.strings_in(key, value),
        }
    }

    fn strings_in(&self, key: &str, value: &Value) -> Result<Vec<String>, DecodeError> {
        crate::fields::value_as_strings(value).ok_or_else(|| self.wrong_type(key, "list of strings"))
    }

    pub(crate) fn source_tree(&self, key: &str) -> Result<SourceTree, DecodeError> {
        let raw = self.string(key)?;
        raw.parse().map_err(|_| self.wrong_type(key, "source tree"))
    }

    pub(crate) fn object(&self, key: &str) -> Result<&'a Fields, DecodeError> {
        self.required(key)?
            .as_object()
            .ok_or_else(|| self.wrong_type(key, "dictionary"))
    }

    /// Array of dictionaries that may be absent
    pub(crate) fn optional_objects(&self, key: &str) -> Result<Option<Vec<&'a Fields>>, DecodeError> {
        let Some(value) = self.value(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "list of dictionaries"))?;
        items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| self.wrong_type(key, "list of dictionaries"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Required reference, retained
    pub(crate) fn handle<T>(&mut self, key: &str) -> Result<Handle<T>, DecodeError> {
        let id = self.id_at(key, self.required(key)?)?;
        Ok(self.store.retain(&id))
    }

    /// Optional reference, retained when present
    pub(crate) fn optional_handle<T>(&mut self, key: &str) -> Result<Option<Handle<T>>, DecodeError> {
        let Some(value) = self.value(key) else {
            return Ok(None);
        };
        let id = self.id_at(key, value)?;
        Ok(Some(self.store.retain(&id)))
    }

    /// Required list of references, each retained
    pub(crate) fn handles<T>(&mut self, key: &str) -> Result<Vec<Handle<T>>, DecodeError> {
        let ids = self
            .required(key)?
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "list of identifiers"))?
            .iter()
            .map(|item| self.id_at(key, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.store.retain_all(&ids))
    }

    /// Required reference inside a nested dictionary, retained
    ///
    /// `key_path` names the nested field in errors, e.g.
    /// `projectReferences.ProductGroup`.
    pub(crate) fn nested_handle<T>(
        &mut self,
        nested: &Fields,
        key: &str,
        key_path: &str,
    ) -> Result<Handle<T>, DecodeError> {
        let value = nested.get(key).ok_or_else(|| self.missing(key_path))?;
        let id = self.id_at(key_path, value)?;
        Ok(self.store.retain(&id))
    }
}
