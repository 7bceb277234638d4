//! Versioned schema migrations backed by an append-only version ledger.

pub mod catalog;
pub mod command;
pub mod conn;
pub mod dialect;
pub mod ledger;
pub mod migrations;
pub mod migrator;
pub mod scaffold;
pub mod sequence;
pub mod version;

pub use catalog::Catalog;
pub use command::{Command, Outcome};
pub use conn::{Connection, LedgerRow, Param};
pub use dialect::Dialect;
pub use ledger::Ledger;
pub use migrations::Migration;
pub use migrator::{MigrationStatus, Migrator};
pub use sequence::MigrationSequence;
