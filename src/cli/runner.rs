//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, ResourceKind};
use crate::client::Client;
use crate::config::{ClientConfig, DEFAULT_CONFIG_PATH};
use crate::error::{Error, Result};
use crate::params::{Filter, Parameters, Sort};
use crate::resources::{
    ActgClass, Bill, Customer, Entity, Invoice, Item, Location, PaymentMade, PaymentReceived,
    Vendor,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Run a generic resource function with the entity type picked by `kind`
macro_rules! for_resource {
    ($kind:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            ResourceKind::Invoices => $func::<Invoice>($($arg),*).await,
            ResourceKind::Bills => $func::<Bill>($($arg),*).await,
            ResourceKind::Customers => $func::<Customer>($($arg),*).await,
            ResourceKind::Vendors => $func::<Vendor>($($arg),*).await,
            ResourceKind::PaymentsMade => $func::<PaymentMade>($($arg),*).await,
            ResourceKind::PaymentsReceived => $func::<PaymentReceived>($($arg),*).await,
            ResourceKind::Locations => $func::<Location>($($arg),*).await,
            ResourceKind::Classes => $func::<ActgClass>($($arg),*).await,
            ResourceKind::Items => $func::<Item>($($arg),*).await,
        }
    };
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::InitConfig { path } => self.init_config(path),
            Commands::List {
                resource,
                filter,
                sort,
                since,
            } => {
                let client = self.client().await?;
                let params = build_params(filter, sort);
                for_resource!(
                    resource,
                    list_records(&client, self.cli.format, params, since.as_ref())
                )
            }
            Commands::Count { resource, filter } => {
                let client = self.client().await?;
                let params = build_params(filter, &[]);
                for_resource!(resource, count_records(&client, params))
            }
            Commands::Get { resource, id } => {
                let client = self.client().await?;
                for_resource!(resource, get_record(&client, self.cli.format, id))
            }
            Commands::OpenInvoices => self.open_invoices().await,
            Commands::ShiftDates {
                customer_id,
                days,
                today,
            } => self.shift_dates(customer_id, *days, *today).await,
            Commands::Stretch {
                customer_id,
                months,
                today,
            } => self.stretch(customer_id, *months, *today).await,
        }
    }

    /// Load the config named on the command line, or the default one if present
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                ClientConfig::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => ClientConfig::default(),
        };
        if let Some(credentials) = &self.cli.credentials {
            config = config.with_credentials_file(credentials);
        }
        Ok(config)
    }

    async fn client(&self) -> Result<Client> {
        let config = self.load_config()?;
        debug!(
            base_url = %config.base_url,
            credentials = %config.credentials_path().display(),
            "Logging in"
        );
        Client::login(&config).await
    }

    fn init_config(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::config(format!(
                "{} already exists; remove it first",
                path.display()
            )));
        }
        ClientConfig::write_default(path)?;
        println!("Wrote {}", path.display());
        Ok(())
    }

    async fn open_invoices(&self) -> Result<()> {
        let client = self.client().await?;
        let invoices = client.open_invoices().await?;
        let total: f64 = invoices.iter().map(|i| i.amount_due).sum();
        info!(invoices = invoices.len(), total_due = total, "Open invoices");
        print_records(self.cli.format, &invoices)
    }

    async fn shift_dates(&self, customer_id: &str, days: i64, today: Option<NaiveDate>) -> Result<()> {
        let client = self.client().await?;
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let updated = client.shift_invoice_dates(customer_id, days, today).await?;
        println!("Updated {updated} invoices for customer {customer_id}");
        Ok(())
    }

    async fn stretch(&self, customer_id: &str, months: usize, today: Option<NaiveDate>) -> Result<()> {
        let client = self.client().await?;
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let summary = client
            .stretch_invoice_schedule(customer_id, months, today)
            .await?;
        println!(
            "Updated {} invoices and created {} for customer {customer_id}, {:.2} each",
            summary.updated,
            summary.created.len(),
            summary.amount_per_invoice
        );
        print_records(self.cli.format, &summary.created)
    }
}

fn build_params(filters: &[Filter], sorts: &[Sort]) -> Parameters {
    Parameters {
        filters: filters.to_vec(),
        sorts: sorts.to_vec(),
    }
}

async fn list_records<T: Entity>(
    client: &Client,
    format: OutputFormat,
    params: Parameters,
    since: Option<&DateTime<FixedOffset>>,
) -> Result<()> {
    let start = Instant::now();
    let resource = client.resource::<T>();

    // Pages that arrived are printed even when others failed
    let listing = match since {
        Some(since) => resource.since_partial(since, params).await?,
        None => resource.all_partial(params).await?,
    };
    print_records(format, &listing.records)?;
    info!(
        entity = T::NAME,
        records = listing.records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Done"
    );
    // The failed pages are reported once, by the returned error
    listing.into_result().map(|_| ())
}

async fn count_records<T: Entity>(client: &Client, params: Parameters) -> Result<()> {
    let pages = client.resource::<T>().count_pages(params).await?;
    println!("{pages}");
    Ok(())
}

async fn get_record<T: Entity>(client: &Client, format: OutputFormat, id: &str) -> Result<()> {
    let record = client.resource::<T>().get(id).await?;
    print_records(format, std::slice::from_ref(&record))
}

fn print_records<T: Serialize>(format: OutputFormat, records: &[T]) -> Result<()> {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        OutputFormat::Pretty => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
    }
    Ok(())
}
