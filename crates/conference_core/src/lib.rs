pub mod authz;
pub mod batch;
pub mod candidates;
pub mod dashboard;
pub mod dates;
pub mod delete;
pub mod descriptor;
pub mod domain;
pub mod duplicate;
pub mod error;
pub mod memory;
pub mod platform;
pub mod ports;

pub use domain::{
    Conference, ConferenceDashboard, DashboardReport, DashboardTrigger, DeleteReport,
    DuplicateOptions, DuplicateReport, DuplicateRequest, SessionStatus,
};
pub use error::LifecycleError;
pub use ports::{Collection, Document, DocumentStore, PortError, PortResult, TokenVerifier};
