use gosling_common::{Error, Result};

/// Version reported when nothing has been applied.
pub const MIN_VERSION: i64 = 0;
pub const MAX_VERSION: i64 = i64::MAX;

/// Digits in a `YYYYMMDDHHMMSS` version.
pub const VERSION_WIDTH: usize = 14;

const FIRST_VERSION: i64 = 10_000_000_000_000;
const LAST_VERSION: i64 = 99_999_999_999_999;

/// Parse a 14-digit `YYYYMMDDHHMMSS` version numeral.
pub fn parse_version(s: &str) -> Result<i64> {
    if s.len() != VERSION_WIDTH || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidVersion(format!(
            "{s:?}: expected a {VERSION_WIDTH}-digit YYYYMMDDHHMMSS version"
        )));
    }
    s.parse::<i64>()
        .map_err(|e| Error::InvalidVersion(format!("{s:?}: {e}")))
}

/// Check that a version given in code has the same 14-digit shape as one
/// read from a file name. This keeps it clear of [`MIN_VERSION`].
pub fn validate_version(version: i64) -> Result<i64> {
    if !(FIRST_VERSION..=LAST_VERSION).contains(&version) {
        return Err(Error::InvalidVersion(format!(
            "{version}: expected a {VERSION_WIDTH}-digit YYYYMMDDHHMMSS version"
        )));
    }
    Ok(version)
}

/// Right-pad a user supplied version prefix with zeros, so `20230102`
/// becomes `20230102000000`. Inputs longer than 14 characters are rejected.
pub fn pad_version_prefix(input: &str) -> Result<i64> {
    if input.len() > VERSION_WIDTH {
        return Err(Error::InvalidVersion(format!(
            "{input:?}: VERSION must be at most {VERSION_WIDTH} characters, in the form YYYYMMDDHHMMSS"
        )));
    }
    let padded = format!("{input:0<width$}", width = VERSION_WIDTH);
    parse_version(&padded)
}

/// Split `20230101000000_create_users` into its version and name.
pub fn parse_migration_stem(stem: &str) -> Result<(i64, String)> {
    let (prefix, name) = stem.split_once('_').unwrap_or((stem, ""));
    Ok((parse_version(prefix)?, name.to_string()))
}
