//! Type definitions for the fraud scoring pipeline

pub mod alert;
pub mod outcome;
pub mod transaction;

pub use alert::BlockAlert;
pub use outcome::{Action, AuditRow, RecentRow, ScoreResponse};
pub use transaction::Transaction;
