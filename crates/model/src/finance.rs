use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    id::Id,
    serde::{date, date_time},
};

use crate::{deployment::Deployment, resource, string_enum};

string_enum! {
    pub enum InvoiceStatus {
        Pending => "pending" | "unpaid" | "issued",
        Paid => "paid",
        Overdue => "overdue",
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Invoice>,
    #[serde(alias = "invoiceNumber")]
    pub invoice_number: Option<String>,
    #[serde(alias = "clientName", alias = "client")]
    pub client_name: Option<String>,
    #[serde(default, alias = "deploymentId")]
    pub deployment_id: Option<Id<Deployment>>,
    #[serde(default)]
    pub amount: f64,
    pub status: InvoiceStatus,
    #[serde(
        default,
        alias = "issueDate",
        deserialize_with = "date::deserialize_lenient",
        serialize_with = "date::serialize_option"
    )]
    pub issue_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "dueDate",
        deserialize_with = "date::deserialize_lenient",
        serialize_with = "date::serialize_option"
    )]
    pub due_date: Option<NaiveDate>,
}

resource!(Invoice, "/invoices", "invoices");

impl Invoice {
    /// Counts towards the outstanding total.
    pub fn is_outstanding(&self) -> bool {
        matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }
}

/// An organisation that lends or borrows bowsers under mutual aid.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Partner {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Partner>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "contactEmail", alias = "contact")]
    pub contact_email: Option<String>,
    pub balance: Option<f64>,
}

resource!(Partner, "/partners", "partners");

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MutualAidTransaction {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<MutualAidTransaction>,
    #[serde(alias = "partnerId")]
    pub partner_id: Id<Partner>,
    #[serde(default)]
    pub amount: f64,
    pub description: Option<String>,
    #[serde(rename = "transaction_type", alias = "type", alias = "transactionType")]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub date: Option<NaiveDateTime>,
}

resource!(
    MutualAidTransaction,
    "/mutual-aid/transactions",
    "mutual aid transactions"
);

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMonth(pub String);

impl fmt::Display for InvalidMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}', expected YYYY-MM", self.0)
    }
}

impl std::error::Error for InvalidMonth {}

impl FromStr for Month {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonth(s.to_owned());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for Month {
    fn schema_name() -> String {
        "Month".to_owned()
    }

    fn json_schema(_gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        schemars::schema::SchemaObject {
            instance_type: Some(schemars::schema::InstanceType::String.into()),
            format: Some("YYYY-MM".to_owned()),
            ..Default::default()
        }
        .into()
    }
}
