//! Donor CRM backend — donors, donations, segments and audit log.
//!
//! Provides the REST API endpoints behind the CRM dashboard.
//! Data stored in DashMap (development); swap to PostgreSQL for production.

pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

pub use handlers::CrmState;
pub use router::crm_router;
pub use store::CrmStore;
