//! Deserializer over a parsed document tree.
//!
//! Both JSON and YAML documents are first parsed into a `serde_json::Value`
//! and then handed to [`TreeDeserializer`], which applies the matching rules
//! every configuration shape relies on:
//!
//! - struct fields and enum variants match after lowercasing and dropping
//!   `_` / `-`, so `vpcSubnetTypes`, `vpc_subnet_types` and `VPC-SUBNET-TYPES`
//!   all land on the same field
//! - an explicit `null` for a sequence, set or map becomes an empty collection
//! - scalars are coerced where the target asks for it (`"3"` into an integer,
//!   `123456789012` into a string)

use std::fmt;

use serde::de::value::StrDeserializer;
use serde::de::{
    self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, Unexpected,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use crate::error::{PathDisplay, Segment};

/// Whether two names match under the case-insensitive naming rules.
pub fn same_name(a: &str, b: &str) -> bool {
    let fold = |s: &str| {
        s.chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect::<Vec<_>>()
    };
    fold(a) == fold(b)
}

/// Error raised while mapping a tree onto a typed shape.
///
/// The path is collected innermost-first while the error bubbles up.
#[derive(Debug)]
pub(crate) enum TreeError {
    Custom {
        path: Vec<Segment>,
        message: String,
    },
    UnknownVariant {
        path: Vec<Segment>,
        value: String,
        expected: Vec<String>,
    },
}

impl TreeError {
    fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            Self::Custom { path, .. } | Self::UnknownVariant { path, .. } => path.push(segment),
        }
        self
    }

    fn unknown_variant_owned(value: &str, expected: &[&str]) -> Self {
        Self::UnknownVariant {
            path: Vec::new(),
            value: value.to_string(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Path to the offending value, outermost segment first.
    pub(crate) fn path(&self) -> Vec<Segment> {
        let path = match self {
            Self::Custom { path, .. } | Self::UnknownVariant { path, .. } => path,
        };
        path.iter().rev().cloned().collect()
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path();
        match self {
            Self::Custom { message, .. } => write!(f, "{} at {}", message, PathDisplay(&path)),
            Self::UnknownVariant {
                value, expected, ..
            } => write!(
                f,
                "unknown value '{}' at {}, expected one of: {}",
                value,
                PathDisplay(&path),
                expected.join(", ")
            ),
        }
    }
}

impl std::error::Error for TreeError {}

impl de::Error for TreeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom {
            path: Vec::new(),
            message: msg.to_string(),
        }
    }

    fn unknown_variant(variant: &str, expected: &'static [&'static str]) -> Self {
        Self::unknown_variant_owned(variant, expected)
    }
}

/// Deserializes any `serde` shape out of a `serde_json::Value`.
pub(crate) struct TreeDeserializer {
    value: Value,
}

impl TreeDeserializer {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => Unexpected::Unsigned(u),
            (None, Some(i)) => Unexpected::Signed(i),
            _ => Unexpected::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

fn match_variant(value: &str, variants: &'static [&'static str]) -> Result<&'static str, TreeError> {
    variants
        .iter()
        .copied()
        .find(|v| *v == value)
        .or_else(|| variants.iter().copied().find(|v| same_name(v, value)))
        .ok_or_else(|| TreeError::unknown_variant_owned(value, variants))
}

/// Renames object keys to the exact field names a struct declares.
///
/// Two keys landing on the same field are an error.
fn fold_keys(
    map: Map<String, Value>,
    fields: &'static [&'static str],
) -> Result<Map<String, Value>, TreeError> {
    let mut folded = Map::with_capacity(map.len());
    let mut sources: Vec<(&'static str, String)> = Vec::new();

    for (key, value) in map {
        let field = fields
            .iter()
            .copied()
            .find(|f| *f == key)
            .or_else(|| fields.iter().copied().find(|f| same_name(f, &key)));
        let Some(field) = field else {
            folded.insert(key, value);
            continue;
        };
        if let Some((_, first)) = sources.iter().find(|(f, _)| *f == field) {
            return Err(de::Error::custom(format_args!(
                "keys '{}' and '{}' both set field '{}'",
                first, key, field
            )));
        }
        sources.push((field, key));
        folded.insert(field.to_string(), value);
    }
    Ok(folded)
}

macro_rules! deserialize_number {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
            match self.value {
                Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
                    Ok(number @ Value::Number(_)) => TreeDeserializer::new(number).deserialize_any(visitor),
                    _ => TreeDeserializer::new(Value::String(s)).deserialize_any(visitor),
                },
                other => TreeDeserializer::new(other).deserialize_any(visitor),
            }
        }
    )*};
}

impl<'de> de::Deserializer<'de> for TreeDeserializer {
    type Error = TreeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => visitor.visit_u64(u),
                (None, Some(i)) => visitor.visit_i64(i),
                _ => visitor.visit_f64(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map)),
        }
    }

    deserialize_number! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => visitor.visit_bool(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => visitor.visit_bool(false),
            other => TreeDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => TreeDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Null => visitor.visit_seq(SeqDeserializer::new(Vec::new())),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Null => visitor.visit_map(MapDeserializer::new(Map::new())),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map)),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        match self.value {
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(fold_keys(map, fields)?)),
            other => TreeDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        match self.value {
            Value::String(s) => {
                let variant: StrDeserializer<'static, TreeError> =
                    match_variant(&s, variants)?.into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Object(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((key, value)) => {
                        let variant = match_variant(&key, variants)?;
                        visitor
                            .visit_enum(EnumDeserializer { variant, value })
                            .map_err(|e| e.within(Segment::Key(key)))
                    }
                    None => Err(de::Error::invalid_length(0, &"a single-key map")),
                }
            }
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"a string or single-key map naming an enum variant",
            )),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        char bytes byte_buf unit_struct tuple tuple_struct identifier
    }
}

struct SeqDeserializer {
    items: std::vec::IntoIter<Value>,
    index: usize,
}

impl SeqDeserializer {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
            index: 0,
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = TreeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, TreeError> {
        match self.items.next() {
            Some(value) => {
                let index = self.index;
                self.index += 1;
                seed.deserialize(TreeDeserializer::new(value))
                    .map(Some)
                    .map_err(|e| e.within(Segment::Index(index)))
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapDeserializer {
    entries: serde_json::map::IntoIter,
    pending: Option<(String, Value)>,
}

impl MapDeserializer {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = TreeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, TreeError> {
        match self.entries.next() {
            Some((key, value)) => {
                let parsed = seed
                    .deserialize(TreeDeserializer::new(Value::String(key.clone())))
                    .map_err(|e| e.within(Segment::Key(key.clone())))?;
                self.pending = Some((key, value));
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, TreeError> {
        match self.pending.take() {
            Some((key, value)) => seed
                .deserialize(TreeDeserializer::new(value))
                .map_err(|e| e.within(Segment::Key(key))),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumDeserializer {
    variant: &'static str,
    value: Value,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = TreeError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantDeserializer), TreeError> {
        let variant: StrDeserializer<'static, TreeError> = self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = TreeError;

    fn unit_variant(self) -> Result<(), TreeError> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, TreeError> {
        seed.deserialize(TreeDeserializer::new(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, TreeError> {
        de::Deserializer::deserialize_seq(TreeDeserializer::new(self.value), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        de::Deserializer::deserialize_struct(TreeDeserializer::new(self.value), "", fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "snake_case")]
    enum Access {
        PublicAndPrivate,
        Private,
        Public,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Cluster {
        name: String,
        endpoint_access: Access,
        #[serde(default)]
        vpc_subnet_types: Vec<String>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
        #[serde(default)]
        logging: BTreeSet<String>,
        desired_size: Option<u32>,
    }

    fn from(value: Value) -> Result<Cluster, TreeError> {
        Cluster::deserialize(TreeDeserializer::new(value))
    }

    #[test]
    fn test_same_name() {
        assert!(same_name("vpcSubnetTypes", "vpc_subnet_types"));
        assert!(same_name("VPC-SUBNET-TYPES", "vpcSubnetTypes"));
        assert!(!same_name("vpc", "vpcs"));
    }

    #[test]
    fn test_property_names_fold() {
        let cluster = from(json!({
            "NAME": "main",
            "Endpoint_Access": "PUBLIC_AND_PRIVATE",
            "vpc-subnet-types": ["private"],
        }))
        .unwrap();
        assert_eq!(cluster.name, "main");
        assert_eq!(cluster.endpoint_access, Access::PublicAndPrivate);
        assert_eq!(cluster.vpc_subnet_types, vec!["private"]);
    }

    #[test]
    fn test_keys_folding_onto_one_field_rejected() {
        let err = from(json!({
            "name": "a",
            "NAME": "b",
            "endpointAccess": "public",
        }))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'NAME'"));
        assert!(message.contains("'name'"));
        assert!(message.contains("field 'name'"));
    }

    #[test]
    fn test_explicit_null_collections_become_empty() {
        let cluster = from(json!({
            "name": "main",
            "endpointAccess": "private",
            "vpcSubnetTypes": null,
            "tags": null,
            "logging": null,
        }))
        .unwrap();
        assert!(cluster.vpc_subnet_types.is_empty());
        assert!(cluster.tags.is_empty());
        assert!(cluster.logging.is_empty());
        assert_eq!(cluster.desired_size, None);
    }

    #[test]
    fn test_scalar_coercion() {
        let cluster = from(json!({
            "name": 1234,
            "endpointAccess": "public",
            "desiredSize": "3",
        }))
        .unwrap();
        assert_eq!(cluster.name, "1234");
        assert_eq!(cluster.desired_size, Some(3));
    }

    #[test]
    fn test_unknown_variant_reports_path_and_choices() {
        let err = from(json!({"name": "main", "endpointAccess": "sideways"})).unwrap_err();
        match &err {
            TreeError::UnknownVariant {
                value, expected, ..
            } => {
                assert_eq!(value, "sideways");
                assert_eq!(expected.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(PathDisplay(&err.path()).to_string(), "endpointAccess");
    }

    #[test]
    fn test_nested_error_path() {
        #[derive(Debug, Deserialize)]
        struct Root {
            #[allow(dead_code)]
            clusters: Vec<Cluster>,
        }
        let err = Root::deserialize(TreeDeserializer::new(json!({
            "clusters": [
                {"name": "a", "endpointAccess": "public"},
                {"name": "b", "endpointAccess": "public", "desiredSize": "many"},
            ]
        })))
        .unwrap_err();
        assert_eq!(PathDisplay(&err.path()).to_string(), "clusters[1].desiredSize");
    }
}
