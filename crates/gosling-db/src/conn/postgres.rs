use ::postgres::error::SqlState;
use ::postgres::types::ToSql;
use ::postgres::{Client, NoTls};
use gosling_common::{Error, Result};
use tracing::info;

use super::{Connection, LedgerRow, Param};
use crate::dialect::LEDGER_TABLE;

pub(super) fn open(url: &str) -> Result<Client> {
    info!("connecting to postgres");
    Client::connect(url, NoTls)
        .map_err(|e| Error::Database(format!("failed to connect to postgres: {e}")))
}

fn bind(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| match p {
            Param::Int(v) => v as &(dyn ToSql + Sync),
            Param::Bool(v) => v as &(dyn ToSql + Sync),
        })
        .collect()
}

impl Connection for Client {
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        Client::execute(self, sql, &bind(params))
            .map_err(|e| map_error(e, "failed to execute statement"))
    }

    fn query_versions(&mut self, sql: &str, params: &[Param]) -> Result<Vec<LedgerRow>> {
        let rows = Client::query(self, sql, &bind(params))
            .map_err(|e| map_error(e, "failed to query version ledger"))?;

        rows.iter()
            .map(|row| {
                Ok(LedgerRow {
                    id: row
                        .try_get(0)
                        .map_err(|e| map_error(e, "failed to read id"))?,
                    version_id: row
                        .try_get(1)
                        .map_err(|e| map_error(e, "failed to read version_id"))?,
                    is_applied: row
                        .try_get(2)
                        .map_err(|e| map_error(e, "failed to read is_applied"))?,
                    tstamp: row
                        .try_get(3)
                        .map_err(|e| map_error(e, "failed to read tstamp"))?,
                })
            })
            .collect()
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        Client::batch_execute(self, sql).map_err(|e| map_error(e, "failed to execute batch"))
    }
}

fn map_error(e: ::postgres::Error, context: &str) -> Error {
    if e.code() == Some(&SqlState::UNDEFINED_TABLE) {
        if let Some(db) = e.as_db_error() {
            if db.message().contains(LEDGER_TABLE) {
                return Error::LedgerMissing(db.message().to_string());
            }
        }
    }
    Error::Database(format!("{context}: {e}"))
}
