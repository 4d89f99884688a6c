use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utility::id::{HasId, Id};

pub use serde_with;

pub mod alert;
pub mod bowser;
pub mod deployment;
pub mod finance;
pub mod location;
pub mod maintenance;
pub mod status;
pub mod user;
pub mod view;

/// A record type the backend exposes as a collection.
pub trait Resource:
    HasId<IdType = String>
    + Serialize
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Path of the collection below the api root, e.g. `/bowsers`.
    const ENDPOINT: &'static str;

    /// Human readable collection name, used in logs and failure reports.
    const NAME: &'static str;

    fn id(&self) -> &Id<Self>;

    fn set_id(&mut self, id: Id<Self>);

    fn item_endpoint(id: &Id<Self>) -> String {
        format!("{}/{}", Self::ENDPOINT, id)
    }
}

/// Implements `HasId` and `Resource` for a struct with an `id: Id<Self>` field.
macro_rules! resource {
    ($name:ident, $endpoint:literal, $collection:literal) => {
        impl utility::id::HasId for $name {
            type IdType = String;
        }

        impl $crate::Resource for $name {
            const ENDPOINT: &'static str = $endpoint;
            const NAME: &'static str = $collection;

            fn id(&self) -> &utility::id::Id<Self> {
                &self.id
            }

            fn set_id(&mut self, id: utility::id::Id<Self>) {
                self.id = id;
            }
        }
    };
}
pub(crate) use resource;

/// A string-valued status field. Known values map to variants, anything
/// else is kept verbatim in `Other` so a new backend state never fails a
/// whole record.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Other(other) => other.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                let lower = value.trim().to_ascii_lowercase();
                $(
                    if lower == $text.to_ascii_lowercase() $(|| lower == $alias)* {
                        return Self::$variant;
                    }
                )+
                Self::Other(value.trim().to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <String as serde::Deserialize>::deserialize(deserializer).map(Self::from)
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_owned()
            }

            fn json_schema(_gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
                schemars::schema::SchemaObject {
                    instance_type: Some(schemars::schema::InstanceType::String.into()),
                    enum_values: Some(vec![$(serde_json::Value::from($text)),+]),
                    ..Default::default()
                }
                .into()
            }
        }
    };
}
pub(crate) use string_enum;

string_enum! {
    /// Urgency shared by alerts, deployments and maintenance jobs.
    pub enum Priority {
        High => "high" | "critical",
        Medium => "medium" | "normal",
        Low => "low",
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithDistance<T> {
    pub distance_km: f64,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithDistance<T> {
    pub fn new(distance_km: f64, content: T) -> Self {
        Self {
            distance_km,
            content,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithDistance<U> {
        WithDistance::new(self.distance_km, f(self.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_priorities_are_kept() {
        assert_eq!(Priority::from("HIGH"), Priority::High);
        assert_eq!(Priority::from("critical"), Priority::High);
        let other: Priority = serde_json::from_str("\"whenever\"").unwrap();
        assert_eq!(other, Priority::Other("whenever".to_owned()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"whenever\"");
    }
}
