//! UKNF Database Layer
//!
//! The `ReportRepository` contract plus its PostgreSQL and in-memory
//! implementations. Uniqueness of active reports and of validation ids is
//! enforced by the store itself; the services treat their own pre-checks as
//! an optimization only.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::InMemoryReportRepository;
pub use postgres::PgReportRepository;
pub use repository::ReportRepository;
