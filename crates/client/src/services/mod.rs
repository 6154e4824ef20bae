//! User-facing flows built on the session, cart and data service.
//!
//! Each service is a cheap, cloneable handle. Services that need the
//! signed-in user read it from the shared [`SessionContext`](crate::session::SessionContext)
//! at call time.

mod auth;
mod catalog;
mod checkout;
mod history;
mod orders;
mod payment;
mod profile;
mod schedule;

pub use auth::{AuthFlowError, AuthFlows, SignUpForm, SignUpResult};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutOrchestrator, CheckoutReceipt};
pub use history::HistoryService;
pub use orders::{OrderError, OrderService, contact_message, whatsapp_url};
pub use payment::{PaymentError, PaymentForm, PaymentService, ValidPayment};
pub use profile::{ProfileError, ProfileService, ProfileUpdate};
pub use schedule::{
    ScheduleError, default_schedule_date, earliest_schedule_date, format_long_date, local_today,
    validate_schedule_date,
};
