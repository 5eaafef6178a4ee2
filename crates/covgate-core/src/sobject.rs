use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A polymorphic platform record: an sObject type tag plus an open, ordered
/// field map. Both the generic query path and the bulk-write path speak this
/// shape; related records nest recursively.
///
/// Serializes as a flat JSON object merging an `attributes.type` wrapper with
/// the field map, the way the composite REST endpoints expect it.
#[derive(Debug, Clone, PartialEq)]
pub struct SObject {
    pub sobject_type: String,
    pub fields: IndexMap<String, FieldValue>,
}

/// Value of one sObject field: either a plain JSON value or a nested
/// related record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Record(Box<SObject>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            FieldValue::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&SObject> {
        match self {
            FieldValue::Scalar(_) => None,
            FieldValue::Record(r) => Some(r),
        }
    }
}

impl SObject {
    pub fn new(sobject_type: impl Into<String>) -> Self {
        Self {
            sobject_type: sobject_type.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Scalar(value.into()));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, record: SObject) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Record(Box::new(record)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_scalar).and_then(Value::as_str)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(map) = value else {
            return Err("sObject record must be a JSON object".to_string());
        };

        let sobject_type = map
            .get("attributes")
            .and_then(|a| a.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut fields = IndexMap::with_capacity(map.len().saturating_sub(1));
        for (key, value) in map {
            if key == "attributes" {
                continue;
            }

            // Objects carrying their own attributes wrapper are related
            // records and decode recursively.
            let is_record = value
                .as_object()
                .is_some_and(|m| m.contains_key("attributes"));
            let field = if is_record {
                FieldValue::Record(Box::new(SObject::from_value(value)?))
            } else {
                FieldValue::Scalar(value)
            };
            fields.insert(key, field);
        }

        Ok(Self {
            sobject_type,
            fields,
        })
    }
}

impl Serialize for SObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Attributes<'a> {
            r#type: &'a str,
        }

        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(
            "attributes",
            &Attributes {
                r#type: &self.sobject_type,
            },
        )?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(v) => v.serialize(serializer),
            FieldValue::Record(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SObject::from_value(value).map_err(D::Error::custom)
    }
}
