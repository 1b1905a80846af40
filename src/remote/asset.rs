use anyhow::{Result, anyhow};
use serde_json::{Map, Value};

pub const CPU_TYPE: &str = "CPU Type";
pub const BATTERY_WEAR: &str = "Battery Wear Level";
pub const DEFECT: &str = "Defect";
pub const COSMETIC_GRADE: &str = "Cosmetic Grade";
pub const FUNCTIONALITY_GRADE: &str = "Functionality Grade";

/// One attribute entry. `extra` keeps whatever else the service sent with it
/// (ids, type ids) so a push does not drop it.
#[derive(Debug, Clone, PartialEq)]
struct AttributeEntry {
    type_name: String,
    value: Value,
    extra: Map<String, Value>,
}

/// Attributes keyed by `typeName`, in the order the service listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: Vec<AttributeEntry>,
}

impl AttributeMap {
    /// Builds the map from the wire list. A repeated `typeName` keeps its
    /// first position and its last value.
    pub fn from_wire(list: &[Value]) -> Self {
        let mut map = AttributeMap::default();
        for item in list {
            let Some(obj) = item.as_object() else {
                continue;
            };
            let Some(type_name) = obj.get("typeName").and_then(Value::as_str) else {
                continue;
            };
            let mut extra = obj.clone();
            extra.remove("typeName");
            let value = extra.remove("value").unwrap_or(Value::Null);

            match map.entries.iter_mut().find(|e| e.type_name == type_name) {
                Some(existing) => {
                    existing.value = value;
                    existing.extra.extend(extra);
                }
                None => map.entries.push(AttributeEntry {
                    type_name: type_name.to_string(),
                    value,
                    extra,
                }),
            }
        }
        map
    }

    pub fn to_wire(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|e| {
                let mut obj = e.extra.clone();
                obj.insert("typeName".into(), Value::String(e.type_name.clone()));
                obj.insert("value".into(), e.value.clone());
                Value::Object(obj)
            })
            .collect()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.iter().any(|e| e.type_name == type_name)
    }

    /// Attribute value rendered as text; numbers are printed, null is absent.
    pub fn get(&self, type_name: &str) -> Option<String> {
        let entry = self.entries.iter().find(|e| e.type_name == type_name)?;
        match &entry.value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Sets a value, appending a new entry for an unknown name. Returns
    /// whether the stored value changed.
    pub fn set(&mut self, type_name: &str, value: &str) -> bool {
        let new_value = Value::String(value.to_string());
        match self.entries.iter_mut().find(|e| e.type_name == type_name) {
            Some(entry) if entry.value == new_value => false,
            Some(entry) => {
                entry.value = new_value;
                true
            }
            None => {
                self.entries.push(AttributeEntry {
                    type_name: type_name.to_string(),
                    value: new_value,
                    extra: Map::new(),
                });
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The remote asset as fetched, with attributes lifted into an
/// [`AttributeMap`] until it is serialized again for a push.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    fields: Map<String, Value>,
    pub attributes: AttributeMap,
}

impl AssetRecord {
    pub fn from_json(body: Value) -> Result<Self> {
        let Value::Object(mut fields) = body else {
            return Err(anyhow!("asset body is not a JSON object"));
        };
        let attributes = match fields.remove("attributes") {
            Some(Value::Array(list)) => AttributeMap::from_wire(&list),
            Some(Value::Null) | None => AttributeMap::default(),
            Some(_) => return Err(anyhow!("asset `attributes` is not a list")),
        };
        Ok(Self { fields, attributes })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("attributes".into(), Value::Array(self.attributes.to_wire()));
        Value::Object(obj)
    }

    pub fn manufacturer(&self) -> &str {
        self.fields
            .get("manufacturer")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.fields
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set_model(&mut self, model: &str) {
        self.fields
            .insert("model".into(), Value::String(model.to_string()));
    }
}
