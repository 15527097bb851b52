//! Core engine for the invoice/expense management application.
//!
//! The engine is a pure state/rules layer: it owns the invoice, vendor and
//! payment lifecycles, the master-data request workflow, tax withholding,
//! settlement reconciliation and the worklist ranking. Transport, sessions,
//! file bytes and message delivery live behind the collaborator traits in
//! [`notify`] and [`storage`] plus the explicit [`Actor`] value.

pub use actor::{Actor, Role};
pub use commands::{CreateVendorCmd, RecordPaymentCmd, SubmitInvoiceCmd, UpdateInvoiceCmd};
pub use currencies::Currency;
pub use error::EngineError;
pub use guardian::GuardianVerdict;
pub use invoices::{Invoice, InvoiceStatus};
pub use ops::{
    BulkOutcome, Engine, EngineBuilder, InvoiceListFilter, SettlementSummary, VendorGate,
    WorklistItem, WorklistPage, WorklistSort,
};
pub use payments::{Payment, PaymentStatus};
pub use requests::{MasterDataRequest, RequestEntityType, RequestPayload, RequestStatus};
pub use tds::{TdsBreakdown, TdsRounding};
pub use vendors::{Vendor, VendorStatus};

mod actor;
mod attachments;
mod categories;
mod comments;
mod commands;
mod currencies;
mod deletion_log;
pub mod due;
mod error;
pub mod guardian;
mod invoice_profiles;
mod invoices;
pub mod notify;
mod ops;
mod payment_types;
mod payments;
mod requests;
pub mod storage;
pub mod tds;
mod users;
mod vendors;

type ResultEngine<T> = Result<T, EngineError>;
