//! Weak-typed decoding of settings subtrees into property group shapes.
//!
//! Configuration sources disagree about leaf types: environment variables are
//! always strings, YAML profiles carry native numbers and booleans, and the
//! default layer carries whatever the group's `Default` impl serialized. The
//! deserializer here accepts all of them against the shape the target type
//! asks for: strings parse into numbers and booleans, scalars render into
//! strings, and comma-delimited strings split into sequences.
//!
//! Decode failures carry the dotted key path of the offending leaf, built up
//! while unwinding through the map and sequence access wrappers.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer,
    MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde_json::{Map, Value};
use std::fmt;

/// Decode a subtree into a typed shape with weak coercion.
pub(crate) fn decode_subtree<T: DeserializeOwned>(subtree: &Value) -> Result<T, DecodeError> {
    T::deserialize(Weak(subtree.clone()))
}

/// Decode failure with the dotted path of the offending key, when known.
#[derive(Debug)]
pub(crate) struct DecodeError {
    pub(crate) key: Option<String>,
    pub(crate) message: String,
}

impl DecodeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            key: None,
            message: message.into(),
        }
    }

    /// Prepend a path segment while unwinding out of a nested container.
    fn nest(mut self, segment: &str) -> Self {
        self.key = Some(match self.key.take() {
            Some(rest) => format!("{segment}.{rest}"),
            None => segment.to_string(),
        });
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} at key [{key}]", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError::new(msg.to_string())
    }
}

/// Short type name of a value for error messages.
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}

/// Deserializer applying weak coercion over an owned JSON value.
struct Weak(Value);

impl Weak {
    fn as_i64(&self) -> Result<i64, DecodeError> {
        match &self.0 {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| DecodeError::new(format!("cannot represent {n} as an integer"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| DecodeError::new(format!("invalid integer [{s}]"))),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(DecodeError::new(format!(
                "expected an integer, got {}",
                kind(other)
            ))),
        }
    }

    fn as_u64(&self) -> Result<u64, DecodeError> {
        match &self.0 {
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                DecodeError::new(format!("cannot represent {n} as an unsigned integer"))
            }),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| DecodeError::new(format!("invalid unsigned integer [{s}]"))),
            Value::Bool(b) => Ok(u64::from(*b)),
            other => Err(DecodeError::new(format!(
                "expected an unsigned integer, got {}",
                kind(other)
            ))),
        }
    }

    fn as_f64(&self) -> Result<f64, DecodeError> {
        match &self.0 {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| DecodeError::new(format!("cannot represent {n} as a float"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| DecodeError::new(format!("invalid float [{s}]"))),
            other => Err(DecodeError::new(format!(
                "expected a float, got {}",
                kind(other)
            ))),
        }
    }
}

macro_rules! deserialize_signed {
    ($($method:ident)*) => {
        $(fn $method<V>(self, visitor: V) -> Result<V::Value, DecodeError>
        where
            V: Visitor<'de>,
        {
            let n = self.as_i64()?;
            visitor.visit_i64(n)
        })*
    };
}

macro_rules! deserialize_unsigned {
    ($($method:ident)*) => {
        $(fn $method<V>(self, visitor: V) -> Result<V::Value, DecodeError>
        where
            V: Visitor<'de>,
        {
            let n = self.as_u64()?;
            visitor.visit_u64(n)
        })*
    };
}

impl<'de> Deserializer<'de> for Weak {
    type Error = DecodeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else {
                    visitor.visit_f64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => visitor.visit_seq(WeakSeq::new(items)),
            Value::Object(map) => visitor.visit_map(WeakMap::new(map)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match &self.0 {
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => visitor.visit_bool(true),
                "false" | "0" => visitor.visit_bool(false),
                _ => Err(DecodeError::new(format!("invalid boolean [{s}]"))),
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => visitor.visit_bool(false),
                Some(1) => visitor.visit_bool(true),
                _ => Err(DecodeError::new(format!("invalid boolean [{n}]"))),
            },
            other => Err(DecodeError::new(format!(
                "expected a boolean, got {}",
                kind(other)
            ))),
        }
    }

    deserialize_signed! { deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 }
    deserialize_unsigned! { deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        let n = self.as_f64()?;
        visitor.visit_f64(n)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        let n = self.as_f64()?;
        visitor.visit_f64(n)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match &self.0 {
            Value::String(s) if s.chars().count() == 1 => {
                visitor.visit_char(s.chars().next().ok_or_else(|| {
                    DecodeError::new("empty string where a character was expected")
                })?)
            }
            other => Err(DecodeError::new(format!(
                "expected a single character, got {}",
                kind(other)
            ))),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::String(s) => visitor.visit_string(s),
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => Err(DecodeError::new(format!(
                "expected a string, got {}",
                kind(&other)
            ))),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            other => Err(DecodeError::new(format!(
                "expected null, got {}",
                kind(&other)
            ))),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(WeakSeq::new(items)),
            // Comma-delimited string to sequence.
            Value::String(s) => {
                let items = if s.trim().is_empty() {
                    Vec::new()
                } else {
                    s.split(',')
                        .map(|part| Value::String(part.trim().to_string()))
                        .collect()
                };
                visitor.visit_seq(WeakSeq::new(items))
            }
            Value::Null => visitor.visit_seq(WeakSeq::new(Vec::new())),
            // A lone scalar binds as a one-element sequence.
            scalar => visitor.visit_seq(WeakSeq::new(vec![scalar])),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Object(map) => visitor.visit_map(WeakMap::new(map)),
            Value::Null => visitor.visit_map(WeakMap::new(Map::new())),
            other => Err(DecodeError::new(format!(
                "expected a map, got {}",
                kind(&other)
            ))),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Object(map) if map.len() == 1 => {
                let Some((variant, value)) = map.into_iter().next() else {
                    return Err(DecodeError::new("expected an enum variant"));
                };
                visitor.visit_enum(WeakEnum { variant, value })
            }
            other => Err(DecodeError::new(format!(
                "expected an enum variant, got {}",
                kind(&other)
            ))),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

struct WeakSeq {
    iter: std::vec::IntoIter<Value>,
    index: usize,
}

impl WeakSeq {
    fn new(items: Vec<Value>) -> Self {
        Self {
            iter: items.into_iter(),
            index: 0,
        }
    }
}

impl<'de> SeqAccess<'de> for WeakSeq {
    type Error = DecodeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, DecodeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => {
                let index = self.index;
                self.index += 1;
                seed.deserialize(Weak(value))
                    .map(Some)
                    .map_err(|err| err.nest(&index.to_string()))
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct WeakMap {
    iter: serde_json::map::IntoIter,
    pending: Option<(String, Value)>,
}

impl WeakMap {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            iter: map.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for WeakMap {
    type Error = DecodeError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, DecodeError>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                let out = seed.deserialize(Weak(Value::String(key.clone())))?;
                self.pending = Some((key, value));
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, DecodeError>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| DecodeError::new("map value requested before its key"))?;
        seed.deserialize(Weak(value)).map_err(|err| err.nest(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct WeakEnum {
    variant: String,
    value: Value,
}

impl<'de> EnumAccess<'de> for WeakEnum {
    type Error = DecodeError;
    type Variant = WeakVariant;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, WeakVariant), DecodeError>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(Weak(Value::String(self.variant)))?;
        Ok((variant, WeakVariant(self.value)))
    }
}

struct WeakVariant(Value);

impl<'de> VariantAccess<'de> for WeakVariant {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, DecodeError>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(Weak(self.0))
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        Weak(self.0).deserialize_seq(visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError>
    where
        V: Visitor<'de>,
    {
        Weak(self.0).deserialize_map(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Server {
        host: String,
        port: u16,
        tls: bool,
        tags: Vec<String>,
    }

    #[test]
    fn strings_coerce_into_numbers_and_booleans() {
        let server: Server = decode_subtree(&json!({
            "host": "localhost",
            "port": "8080",
            "tls": "true",
            "tags": ["a", "b"],
        }))
        .expect("decode");
        assert_eq!(server.host, "localhost");
        assert_eq!(server.port, 8080);
        assert!(server.tls);
        assert_eq!(server.tags, vec!["a", "b"]);
    }

    #[test]
    fn scalars_coerce_into_strings() {
        #[derive(Debug, Deserialize)]
        struct Labeled {
            label: String,
        }
        let labeled: Labeled = decode_subtree(&json!({"label": 42})).expect("decode");
        assert_eq!(labeled.label, "42");
    }

    #[test]
    fn comma_delimited_string_splits_into_sequence() {
        #[derive(Debug, Deserialize)]
        struct Tagged {
            tags: Vec<String>,
        }
        let tagged: Tagged = decode_subtree(&json!({"tags": "a, b,c"})).expect("decode");
        assert_eq!(tagged.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn lone_scalar_binds_as_single_element_sequence() {
        #[derive(Debug, Deserialize)]
        struct Ports {
            ports: Vec<u16>,
        }
        let ports: Ports = decode_subtree(&json!({"ports": 8080})).expect("decode");
        assert_eq!(ports.ports, vec![8080]);
    }

    #[test]
    fn duration_fields_parse_unit_suffixes() {
        #[derive(Debug, Deserialize)]
        struct Timeouts {
            #[serde(with = "humantime_serde")]
            connect: Duration,
        }
        let timeouts: Timeouts = decode_subtree(&json!({"connect": "250ms"})).expect("decode");
        assert_eq!(timeouts.connect, Duration::from_millis(250));
    }

    #[test]
    fn unit_enum_variants_decode_from_strings() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Mode {
            Strict,
            Lenient,
        }
        #[derive(Debug, Deserialize)]
        struct Policy {
            mode: Mode,
        }
        let policy: Policy = decode_subtree(&json!({"mode": "strict"})).expect("decode");
        assert_eq!(policy.mode, Mode::Strict);
    }

    #[test]
    fn mismatched_leaf_reports_its_dotted_key() {
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[allow(dead_code)]
            inner: Inner,
        }
        #[derive(Debug, Deserialize)]
        struct Inner {
            #[allow(dead_code)]
            count: u32,
        }
        let err = decode_subtree::<Outer>(&json!({"inner": {"count": "not-a-number"}}))
            .expect_err("should fail");
        assert_eq!(err.key.as_deref(), Some("inner.count"));
        assert!(err.message.contains("not-a-number"));
    }

    #[test]
    fn sequence_errors_report_the_index() {
        #[derive(Debug, Deserialize)]
        struct Ports {
            #[allow(dead_code)]
            ports: Vec<u16>,
        }
        let err =
            decode_subtree::<Ports>(&json!({"ports": [80, "nope"]})).expect_err("should fail");
        assert_eq!(err.key.as_deref(), Some("ports.1"));
    }
}
