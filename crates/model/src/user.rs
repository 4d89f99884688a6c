use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::Id, serde::date_time};

use crate::resource;

/// Dashboard account as listed by the backend. Credentials never reach the
/// client.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<User>,
    #[serde(default)]
    pub username: String,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(
        default,
        alias = "lastLogin",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub last_login: Option<NaiveDateTime>,
}

resource!(User, "/users", "users");
