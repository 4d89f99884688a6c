use std::{borrow::Cow, fmt, hash, marker::PhantomData};

use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};

pub trait HasId {
    type IdType;
}

/// Identifier of a `T`. The phantom type keeps a bowser id from being passed
/// where a location id is expected, even though both are strings on the wire.
pub struct Id<T: HasId>(T::IdType, PhantomData<T>);

impl<T: HasId> Id<T> {
    pub fn new(inner: T::IdType) -> Self {
        Self(inner, PhantomData)
    }
}

impl<T: HasId<IdType = String>> Id<T> {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Records created locally carry a blank id until the server assigns one.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<T: HasId<IdType = String>> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl<T: HasId<IdType = String>> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: HasId> Default for Id<T>
where
    T::IdType: Default,
{
    fn default() -> Self {
        Self(Default::default(), PhantomData)
    }
}

impl<T: HasId> fmt::Debug for Id<T>
where
    T::IdType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.0).finish()
    }
}

impl<T: HasId> fmt::Display for Id<T>
where
    T::IdType: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: HasId> Clone for Id<T>
where
    T::IdType: Clone,
{
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T: HasId> hash::Hash for Id<T>
where
    T::IdType: hash::Hash,
{
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T: HasId> PartialEq for Id<T>
where
    T::IdType: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T: HasId> Eq for Id<T> where T::IdType: Eq {}

/// Ids arrive as strings from the sql backend but as integers from older
/// seed data, so both are accepted and normalized to a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
}

impl<'de, T: HasId> Deserialize<'de> for Id<T>
where
    T::IdType: From<String>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Integer(number) => number.to_string(),
        };
        Ok(Id::new(raw.into()))
    }
}

impl<T: HasId> Serialize for Id<T>
where
    T::IdType: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T: HasId + JsonSchema> JsonSchema for Id<T>
where
    T::IdType: Serialize,
{
    fn schema_name() -> String {
        // Exclude the module path to make the name in generated schemas clearer.
        format!("{}Id", T::schema_name())
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Borrowed(concat!(module_path!(), "::Id"))
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("id".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bowser;

    impl HasId for Bowser {
        type IdType = String;
    }

    #[test]
    fn numeric_ids_become_strings() {
        let id: Id<Bowser> = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");

        let id: Id<Bowser> = serde_json::from_str("\"BWR002\"").unwrap();
        assert_eq!(id, Id::from("BWR002"));
    }

    #[test]
    fn blank_ids() {
        assert!(Id::<Bowser>::default().is_blank());
        assert!(Id::<Bowser>::from("  ").is_blank());
        assert!(!Id::<Bowser>::from("BWR001").is_blank());
    }
}
