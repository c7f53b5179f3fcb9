//! Application-defined SQL functions registered on every connection.
//!
//! - `fold(text)`: Unicode lower-casing. SQLite's own `lower()` and `LIKE`
//!   only fold ASCII.
//! - `price_cmp(a, b)`: compares two decimal strings exactly, returning
//!   `-1`, `0` or `1`.

use std::{cmp::Ordering, str::FromStr as _};

use rusqlite::{Connection, functions::FunctionFlags};
use rust_decimal::Decimal;

pub fn register(conn: &Connection) -> rusqlite::Result<()> {
  let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

  conn.create_scalar_function("fold", 1, flags, |ctx| {
    let text: String = ctx.get(0)?;
    Ok(text.to_lowercase())
  })?;

  conn.create_scalar_function("price_cmp", 2, flags, |ctx| {
    let a = decimal(&ctx.get::<String>(0)?)?;
    let b = decimal(&ctx.get::<String>(1)?)?;
    Ok(match a.cmp(&b) {
      Ordering::Less => -1_i64,
      Ordering::Equal => 0,
      Ordering::Greater => 1,
    })
  })?;

  Ok(())
}

fn decimal(s: &str) -> rusqlite::Result<Decimal> {
  Decimal::from_str(s).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    register(&conn).unwrap();
    conn
  }

  #[test]
  fn fold_lowercases_beyond_ascii() {
    let folded: String = conn()
      .query_row("SELECT fold('Öl ÉTÉ Chair')", [], |r| r.get(0))
      .unwrap();
    assert_eq!(folded, "öl été chair");
  }

  #[test]
  fn price_cmp_is_exact() {
    let conn = conn();
    let cmp = |a: &str, b: &str| -> i64 {
      conn
        .query_row("SELECT price_cmp(?1, ?2)", [a, b], |r| r.get(0))
        .unwrap()
    };
    assert_eq!(cmp("0.3", "0.30000000000000001"), -1);
    assert_eq!(cmp("0.30", "0.3"), 0);
    assert_eq!(cmp("100", "25.5"), 1);
  }

  #[test]
  fn price_cmp_rejects_non_decimals() {
    let result: rusqlite::Result<i64> =
      conn().query_row("SELECT price_cmp('abc', '1')", [], |r| r.get(0));
    assert!(result.is_err());
  }
}
