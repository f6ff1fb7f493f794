pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod store;

pub use config::{Config, Directory, Roster, State, Tenant};
pub use cycle::{Bill, BillingKind, BillingPolicy, DisplayStatus, MeterReading, PaymentStatus};
pub use engine::{BillingEngine, Checkout, GenerationOutcome, RenewalReport, SweepReport};
pub use error::{BillingError, ErrorKind, Result};
pub use gateway::{HttpGateway, PaymentGateway, TransactionStatus};
pub use store::{BillFilter, BillStore, FileStore, MemoryStore};
