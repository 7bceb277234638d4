use ::mysql::prelude::Queryable;
use ::mysql::{Conn, Opts, Params, Value};
use gosling_common::{Error, Result};
use tracing::info;

use super::{Connection, LedgerRow, Param};
use crate::dialect::LEDGER_TABLE;

/// Server error code for "Table doesn't exist".
const ER_NO_SUCH_TABLE: u16 = 1146;

pub(super) fn open(url: &str) -> Result<Conn> {
    info!("connecting to mysql");
    let opts = Opts::from_url(url)
        .map_err(|e| Error::Config(format!("invalid mysql connection url: {e}")))?;
    Conn::new(opts).map_err(|e| Error::Database(format!("failed to connect to mysql: {e}")))
}

fn bind(params: &[Param]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|p| match *p {
                Param::Int(v) => Value::Int(v),
                Param::Bool(v) => Value::Int(i64::from(v)),
            })
            .collect(),
    )
}

impl Connection for Conn {
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        self.exec_drop(sql, bind(params))
            .map_err(|e| map_error(e, "failed to execute statement"))?;
        Ok(self.affected_rows())
    }

    fn query_versions(&mut self, sql: &str, params: &[Param]) -> Result<Vec<LedgerRow>> {
        let rows: Vec<(i64, i64, bool, Option<String>)> = self
            .exec(sql, bind(params))
            .map_err(|e| map_error(e, "failed to query version ledger"))?;

        Ok(rows
            .into_iter()
            .map(|(id, version_id, is_applied, tstamp)| LedgerRow {
                id,
                version_id,
                is_applied,
                tstamp,
            })
            .collect())
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        self.query_drop(sql)
            .map_err(|e| map_error(e, "failed to execute batch"))
    }
}

fn map_error(e: ::mysql::Error, context: &str) -> Error {
    match &e {
        ::mysql::Error::MySqlError(server)
            if server.code == ER_NO_SUCH_TABLE && server.message.contains(LEDGER_TABLE) =>
        {
            Error::LedgerMissing(server.message.clone())
        }
        _ => Error::Database(format!("{context}: {e}")),
    }
}
