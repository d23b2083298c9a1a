//! Deserialize configuration subtrees into typed values
//!
//! Every leaf in the tree is a string, so scalars are parsed on demand:
//! the target type decides how a value is read. Struct fields and enum
//! variants are matched case-insensitively.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use std::fmt;
use std::str::FromStr;

use super::section::ConfigurationSection;
use crate::error::{ConfigError, Result};

#[derive(Debug)]
pub(crate) struct BindError(String);

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BindError {}

impl de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError(msg.to_string())
    }
}

pub(crate) fn from_section<T: DeserializeOwned>(section: &ConfigurationSection) -> Result<T> {
    T::deserialize(SectionDeserializer::new(section.clone())).map_err(|e| {
        let path = if section.path().is_empty() {
            "<root>"
        } else {
            section.path()
        };
        ConfigError::Bind(format!("{}: {}", path, e))
    })
}

struct SectionDeserializer {
    section: ConfigurationSection,
}

impl SectionDeserializer {
    fn new(section: ConfigurationSection) -> Self {
        Self { section }
    }

    fn value(&self) -> std::result::Result<String, BindError> {
        self.section
            .value()
            .ok_or_else(|| BindError(format!("no value at '{}'", self.section.path())))
    }

    fn parse<T>(&self, expected: &str) -> std::result::Result<T, BindError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.value()?;
        raw.trim().parse::<T>().map_err(|e| {
            BindError(format!(
                "cannot read '{}' at '{}' as {}: {}",
                raw,
                self.section.path(),
                expected,
                e
            ))
        })
    }
}

macro_rules! deserialize_parsed {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
            visitor.$visit(self.parse::<$ty>(stringify!($ty))?)
        }
    };
}

impl<'de> de::Deserializer<'de> for SectionDeserializer {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        let children = self.section.children();
        if !children.is_empty() {
            return visitor.visit_map(SectionMap::new(children, None));
        }
        match self.section.value() {
            Some(value) => visitor.visit_string(value),
            None => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        let raw = self.value()?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            _ => Err(BindError(format!(
                "cannot read '{}' at '{}' as bool",
                raw,
                self.section.path()
            ))),
        }
    }

    deserialize_parsed!(deserialize_i8, visit_i8, i8);
    deserialize_parsed!(deserialize_i16, visit_i16, i16);
    deserialize_parsed!(deserialize_i32, visit_i32, i32);
    deserialize_parsed!(deserialize_i64, visit_i64, i64);
    deserialize_parsed!(deserialize_u8, visit_u8, u8);
    deserialize_parsed!(deserialize_u16, visit_u16, u16);
    deserialize_parsed!(deserialize_u32, visit_u32, u32);
    deserialize_parsed!(deserialize_u64, visit_u64, u64);
    deserialize_parsed!(deserialize_f32, visit_f32, f32);
    deserialize_parsed!(deserialize_f64, visit_f64, f64);
    deserialize_parsed!(deserialize_char, visit_char, char);

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_string(self.value()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_string(self.value()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_byte_buf(self.value()?.into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_byte_buf(self.value()?.into_bytes())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        if self.section.exists() {
            visitor.visit_some(self)
        } else {
            visitor.visit_none()
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_seq(SectionSeq {
            children: self.section.children().into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, BindError> {
        visitor.visit_map(SectionMap::new(self.section.children(), None))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        visitor.visit_map(SectionMap::new(self.section.children(), Some(fields)))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        let raw = self.value()?;
        let trimmed = raw.trim();
        let variant = variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(trimmed))
            .map(|v| v.to_string())
            .unwrap_or_else(|| trimmed.to_string());
        visitor.visit_enum(UnitVariant { variant })
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

struct SectionSeq {
    children: std::vec::IntoIter<ConfigurationSection>,
}

impl<'de> SeqAccess<'de> for SectionSeq {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> std::result::Result<Option<T::Value>, BindError> {
        match self.children.next() {
            Some(child) => seed.deserialize(SectionDeserializer::new(child)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.children.len())
    }
}

struct SectionMap {
    children: std::vec::IntoIter<ConfigurationSection>,
    fields: Option<&'static [&'static str]>,
    current: Option<ConfigurationSection>,
}

impl SectionMap {
    fn new(children: Vec<ConfigurationSection>, fields: Option<&'static [&'static str]>) -> Self {
        Self {
            children: children.into_iter(),
            fields,
            current: None,
        }
    }

    /// Map a child key onto the declared field name it matches, ignoring case
    fn field_name(&self, key: &str) -> String {
        self.fields
            .and_then(|fields| fields.iter().find(|f| f.eq_ignore_ascii_case(key)))
            .map(|f| f.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl<'de> MapAccess<'de> for SectionMap {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, BindError> {
        let Some(child) = self.children.next() else {
            return Ok(None);
        };
        let name = self.field_name(child.key());
        self.current = Some(child);
        let key: de::value::StringDeserializer<BindError> = name.into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> std::result::Result<V::Value, BindError> {
        let child = self
            .current
            .take()
            .ok_or_else(|| BindError("value requested before key".to_string()))?;
        seed.deserialize(SectionDeserializer::new(child))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.children.len())
    }
}

struct UnitVariant {
    variant: String,
}

impl<'de> EnumAccess<'de> for UnitVariant {
    type Error = BindError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> std::result::Result<(V::Value, Self), BindError> {
        let name: de::value::StringDeserializer<BindError> = self.variant.clone().into_deserializer();
        let value = seed.deserialize(name)?;
        Ok((value, self))
    }
}

impl<'de> VariantAccess<'de> for UnitVariant {
    type Error = BindError;

    fn unit_variant(self) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        _seed: T,
    ) -> std::result::Result<T::Value, BindError> {
        Err(BindError(format!("variant '{}' must be a unit variant", self.variant)))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        Err(BindError(format!("variant '{}' must be a unit variant", self.variant)))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> std::result::Result<V::Value, BindError> {
        Err(BindError(format!("variant '{}' must be a unit variant", self.variant)))
    }
}
