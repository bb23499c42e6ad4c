//! Typed resources
//!
//! A [`Resource`] binds an [`Entity`] type to a [`Client`]. Listing goes
//! through the fetch engine; single-object reads and writes are plain
//! `Crud/*` calls.

mod entities;
mod patch;

pub use entities::{
    format_date, parse_date, ActgClass, Bill, BillLineItem, Customer, Invoice, InvoiceLineItem,
    InvoicePay, Item, Location, PaymentMade, PaymentReceived, Vendor, ACTIVE,
};
pub use patch::InvoicePatch;

use crate::client::Client;
use crate::decode::{decode_list, decode_one};
use crate::error::{Error, Result};
use crate::fetch::FetchErrors;
use crate::params::{Operator, Parameters};
use crate::types::TIME_FORMAT;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A record type the platform exposes through `List`, `Crud/Read`,
/// `Crud/Create` and `Crud/Update`
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Endpoint suffix, e.g. `Invoice.json`
    const SUFFIX: &'static str;

    /// Human-readable name used in messages
    const NAME: &'static str;

    /// Platform id, empty for objects not created yet
    fn id(&self) -> &str;
}

/// Records of a listing together with the pages that could not be fetched
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub errors: Option<FetchErrors>,
}

impl<T> Listing<T> {
    /// Whether every page arrived
    pub fn is_complete(&self) -> bool {
        self.errors.is_none()
    }

    /// The records, or the page errors if any page is missing
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.errors {
            Some(errors) => Err(Error::PartialFetch(errors)),
            None => Ok(self.records),
        }
    }
}

/// Typed access to one entity type
pub struct Resource<'a, T> {
    client: &'a Client,
    cancel: CancellationToken,
    _entity: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Resource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("entity", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<'a, T: Entity> Resource<'a, T> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
            _entity: PhantomData,
        }
    }

    /// Stop listings of this resource when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn list_endpoint() -> String {
        format!("List/{}", T::SUFFIX)
    }

    /// Every record matching `params`, failing if any page is missing
    pub async fn all(&self, params: Parameters) -> Result<Vec<T>> {
        self.all_partial(params).await?.into_result()
    }

    /// Every record matching `params` that could be fetched
    ///
    /// Only a failure to count the pages is an error; pages lost during the
    /// fetch are listed in [`Listing::errors`].
    pub async fn all_partial(&self, params: Parameters) -> Result<Listing<T>> {
        let outcome = self
            .client
            .engine()
            .fetch_all_matching(&Self::list_endpoint(), params, &self.cancel)
            .await?;

        let (records, errors) = outcome.decode_records(decode_list::<T>);
        info!(
            entity = T::NAME,
            records = records.len(),
            failed_pages = errors.as_ref().map_or(0, FetchErrors::len),
            "Listed records"
        );
        Ok(Listing { records, errors })
    }

    /// Every record updated after `time`, plus `params`
    pub async fn since<Tz>(&self, time: &DateTime<Tz>, params: Parameters) -> Result<Vec<T>>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.since_partial(time, params).await?.into_result()
    }

    /// Records updated after `time` that could be fetched, as [`Resource::all_partial`]
    pub async fn since_partial<Tz>(
        &self,
        time: &DateTime<Tz>,
        params: Parameters,
    ) -> Result<Listing<T>>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.all_partial(updated_after(time, params)).await
    }

    /// Every record updated after the timestamp stored in `path`
    ///
    /// The file holds a single timestamp in the platform's time format,
    /// e.g. as written after the previous sync.
    pub async fn since_file(&self, path: impl AsRef<Path>, params: Parameters) -> Result<Vec<T>> {
        let time = read_time_file(path.as_ref())?;
        self.since(&time, params).await
    }

    /// Number of pages matching `params`
    pub async fn count_pages(&self, params: Parameters) -> Result<usize> {
        self.client
            .engine()
            .count_pages(&Self::list_endpoint(), params, &self.cancel)
            .await
    }

    /// Read one record
    pub async fn get(&self, id: &str) -> Result<T> {
        if id.is_empty() {
            return Err(Error::invalid_value("id", format!("{} id must not be empty", T::NAME)));
        }
        let body = self
            .client
            .post(&format!("Crud/Read/{}", T::SUFFIX), &json!({ "id": id }))
            .await?;
        decode_one(&body)
    }

    /// Create a record and return it as stored
    pub async fn create(&self, entity: &T) -> Result<T> {
        let body = self
            .client
            .post(&format!("Crud/Create/{}", T::SUFFIX), &json!({ "obj": entity }))
            .await?;
        let created: T = decode_one(&body)?;
        info!(entity = T::NAME, id = created.id(), "Created record");
        Ok(created)
    }

    /// Replace a record and return it as stored
    pub async fn update(&self, entity: &T) -> Result<T> {
        if entity.id().is_empty() {
            return Err(Error::invalid_value(
                "id",
                format!("an id is required to update a {}", T::NAME),
            ));
        }
        let body = self
            .client
            .post(&format!("Crud/Update/{}", T::SUFFIX), &json!({ "obj": entity }))
            .await?;
        debug!(entity = T::NAME, id = entity.id(), "Updated record");
        decode_one(&body)
    }
}

impl Resource<'_, Invoice> {
    /// Read an invoice, apply `patch` and write it back
    pub async fn patch(&self, id: &str, patch: &InvoicePatch) -> Result<Invoice> {
        let mut invoice = self.get(id).await?;
        patch.apply(&mut invoice);
        self.update(&invoice).await
    }
}

fn updated_after<Tz>(time: &DateTime<Tz>, params: Parameters) -> Parameters
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    params.filter("updatedTime", Operator::Gt, time.format(TIME_FORMAT).to_string())
}

fn read_time_file(path: &Path) -> Result<DateTime<FixedOffset>> {
    let content = std::fs::read_to_string(path)?;
    let value = content.trim();
    if value.is_empty() {
        return Err(Error::config(format!("File {} is empty", path.display())));
    }
    DateTime::parse_from_str(value, TIME_FORMAT).map_err(|e| {
        Error::invalid_value(
            path.display().to_string(),
            format!("'{value}' is not a timestamp in {TIME_FORMAT}: {e}"),
        )
    })
}
