use async_trait::async_trait;
use model::{
    alert::Alert,
    bowser::Bowser,
    deployment::Deployment,
    finance::{Invoice, MutualAidTransaction, Partner},
    location::Location,
    maintenance::MaintenanceRecord,
    user::User,
    Resource,
};
use reqwest::Method;
use serde::Serialize;
use utility::id::Id;

use crate::{backend::Backend, envelope, RequestError, RequestResult};

/// A collection that could not be loaded and is served empty instead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFailure {
    pub collection: &'static str,
    pub error: String,
}

/// A group of collections that are always loaded together and swapped in
/// as one snapshot.
#[async_trait]
pub trait CollectionSet: Default + Clone + Send + Sync + 'static {
    /// Fetches every collection concurrently. A failed collection comes
    /// back empty and is reported, the others are unaffected.
    async fn fetch<B: Backend>(backend: &B) -> (Self, Vec<CollectionFailure>);
}

/// Access to the cached records of one resource type.
pub trait Holds<T: Resource> {
    fn records(&self) -> &Vec<T>;

    fn records_mut(&mut self) -> &mut Vec<T>;

    fn find(&self, id: &Id<T>) -> Option<&T> {
        self.records().iter().find(|record| record.id() == id)
    }

    /// Checked before a record is written. Rejections happen before any
    /// request is sent.
    fn validate(&self, _record: &T) -> RequestResult<()> {
        Ok(())
    }
}

pub async fn fetch_collection<B: Backend, T: Resource>(backend: &B) -> RequestResult<Vec<T>> {
    let value = backend.request(Method::GET, T::ENDPOINT, None).await?;
    envelope::decode_list(value)
}

/// Fail-soft: a failed fetch is logged, reported and replaced by an empty
/// collection.
fn settle<T: Resource>(
    result: RequestResult<Vec<T>>,
    failures: &mut Vec<CollectionFailure>,
) -> Vec<T> {
    match result {
        Ok(records) => records,
        Err(why) => {
            log::warn!("Failed to load {}, serving it empty: {}", T::NAME, why);
            failures.push(CollectionFailure {
                collection: T::NAME,
                error: why.to_string(),
            });
            Vec::new()
        }
    }
}

macro_rules! holds {
    ($set:ident, $resource:ty, $field:ident) => {
        impl Holds<$resource> for $set {
            fn records(&self) -> &Vec<$resource> {
                &self.$field
            }

            fn records_mut(&mut self) -> &mut Vec<$resource> {
                &mut self.$field
            }
        }
    };
}

/// The operational data behind the dashboard.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub locations: Vec<Location>,
    pub bowsers: Vec<Bowser>,
    pub deployments: Vec<Deployment>,
    pub maintenance: Vec<MaintenanceRecord>,
    pub alerts: Vec<Alert>,
    pub users: Vec<User>,
}

#[async_trait]
impl CollectionSet for Collections {
    async fn fetch<B: Backend>(backend: &B) -> (Self, Vec<CollectionFailure>) {
        let (locations, bowsers, deployments, maintenance, alerts, users) = futures::join!(
            fetch_collection::<B, Location>(backend),
            fetch_collection::<B, Bowser>(backend),
            fetch_collection::<B, Deployment>(backend),
            fetch_collection::<B, MaintenanceRecord>(backend),
            fetch_collection::<B, Alert>(backend),
            fetch_collection::<B, User>(backend),
        );
        let mut failures = Vec::new();
        let collections = Self {
            locations: settle(locations, &mut failures),
            bowsers: settle(bowsers, &mut failures),
            deployments: settle(deployments, &mut failures),
            maintenance: settle(maintenance, &mut failures),
            alerts: settle(alerts, &mut failures),
            users: settle(users, &mut failures),
        };
        for deployment in collections.dangling_deployments() {
            log::warn!(
                "Deployment {} points at a missing location {} or bowser {}, hiding it.",
                deployment.id,
                deployment.location_id,
                deployment.bowser_id
            );
        }
        (collections, failures)
    }
}

impl Collections {
    /// Deployments whose location or bowser is not in the snapshot.
    pub fn dangling_deployments(&self) -> Vec<&Deployment> {
        self.deployments
            .iter()
            .filter(|deployment| {
                self.find(&deployment.location_id).is_none()
                    || self.find(&deployment.bowser_id).is_none()
            })
            .collect()
    }
}

holds!(Collections, Location, locations);
holds!(Collections, Bowser, bowsers);
holds!(Collections, MaintenanceRecord, maintenance);
holds!(Collections, Alert, alerts);
holds!(Collections, User, users);

impl Holds<Deployment> for Collections {
    fn records(&self) -> &Vec<Deployment> {
        &self.deployments
    }

    fn records_mut(&mut self) -> &mut Vec<Deployment> {
        &mut self.deployments
    }

    /// A bowser can only serve one site at a time.
    fn validate(&self, record: &Deployment) -> RequestResult<()> {
        if !record.is_active() {
            return Ok(());
        }
        match self
            .deployments
            .iter()
            .find(|other| other.is_active() && other.bowser_id == record.bowser_id && other.id != record.id)
        {
            Some(other) => Err(RequestError::Conflict(format!(
                "bowser {} is already deployed by {}",
                record.bowser_id, other.id
            ))),
            None => Ok(()),
        }
    }
}

impl Collections {
    pub fn active_deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.deployments.iter().filter(|deployment| deployment.is_active())
    }

    /// The active deployment of a bowser, or its scheduled one.
    pub fn deployment_for_bowser(&self, bowser_id: &Id<Bowser>) -> Option<&Deployment> {
        let mut candidates = self
            .deployments
            .iter()
            .filter(|deployment| &deployment.bowser_id == bowser_id && deployment.is_active_or_scheduled());
        let first = candidates.next()?;
        Some(if first.is_active() {
            first
        } else {
            candidates.find(|deployment| deployment.is_active()).unwrap_or(first)
        })
    }

    pub fn maintenance_for_bowser<'a>(
        &'a self,
        bowser_id: &'a Id<Bowser>,
    ) -> impl Iterator<Item = &'a MaintenanceRecord> + 'a {
        self.maintenance
            .iter()
            .filter(move |record| &record.bowser_id == bowser_id)
    }
}

/// Financial records. Loaded and refreshed on their own, never joined with
/// [`Collections`].
#[derive(Debug, Clone, Default)]
pub struct FinanceCollections {
    pub partners: Vec<Partner>,
    pub invoices: Vec<Invoice>,
    pub transactions: Vec<MutualAidTransaction>,
}

#[async_trait]
impl CollectionSet for FinanceCollections {
    async fn fetch<B: Backend>(backend: &B) -> (Self, Vec<CollectionFailure>) {
        let (partners, invoices, transactions) = futures::join!(
            fetch_collection::<B, Partner>(backend),
            fetch_collection::<B, Invoice>(backend),
            fetch_collection::<B, MutualAidTransaction>(backend),
        );
        let mut failures = Vec::new();
        let collections = Self {
            partners: settle(partners, &mut failures),
            invoices: settle(invoices, &mut failures),
            transactions: settle(transactions, &mut failures),
        };
        (collections, failures)
    }
}

holds!(FinanceCollections, Partner, partners);
holds!(FinanceCollections, Invoice, invoices);
holds!(FinanceCollections, MutualAidTransaction, transactions);
