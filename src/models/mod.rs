//! Core data models for statepack
//!
//! The state a host application hands to the backup engine: accounts with
//! credentials, flat preferences, and database dumps.

pub mod account;
pub mod ids;
pub mod preference;
pub mod table;

pub use account::{Account, AccountValidationError, Credential};
pub use ids::AccountId;
pub use preference::{PreferenceValue, Preferences};
pub use table::{DatabaseDump, TableRow};
