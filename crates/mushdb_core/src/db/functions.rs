//! Scalar SQL functions backed by the pure codec module.
//!
//! # Responsibility
//! - Expose set membership and merge-patch to read-modify-write statements,
//!   so a mutation is one `UPDATE` rather than a select/encode/update trip.
//!
//! # Invariants
//! - Every function is deterministic and keeps no state between calls.
//! - Set arguments are compared as JSON: an SQL INTEGER matches a JSON
//!   integer, SQL TEXT matches a JSON string.

use crate::codec::{attributes, set_ops, CodecError};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

/// `in_array(set, value)` -> 0/1.
pub const FN_IN_ARRAY: &str = "in_array";
/// `add_to_array(set, value)` -> encoded set.
pub const FN_ADD_TO_ARRAY: &str = "add_to_array";
/// `remove_from_array(set, value)` -> encoded set.
pub const FN_REMOVE_FROM_ARRAY: &str = "remove_from_array";
/// `merge_patch(document, patch)` -> encoded document.
pub const FN_MERGE_PATCH: &str = "merge_patch";

/// Registers all store functions on `conn`.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function(FN_IN_ARRAY, 2, flags, |ctx| {
        let set = ctx.get::<String>(0)?;
        let value = set_element_arg(ctx, 1)?;
        set_ops::contains(&set, &value).map_err(user_error)
    })?;

    conn.create_scalar_function(FN_ADD_TO_ARRAY, 2, flags, |ctx| {
        let set = ctx.get::<String>(0)?;
        let value = set_element_arg(ctx, 1)?;
        set_ops::add(&set, value).map_err(user_error)
    })?;

    conn.create_scalar_function(FN_REMOVE_FROM_ARRAY, 2, flags, |ctx| {
        let set = ctx.get::<String>(0)?;
        let value = set_element_arg(ctx, 1)?;
        set_ops::remove(&set, &value).map_err(user_error)
    })?;

    conn.create_scalar_function(FN_MERGE_PATCH, 2, flags, |ctx| {
        let document = ctx.get::<String>(0)?;
        let patch = ctx.get::<String>(1)?;
        attributes::merge_patch_encoded(&document, &patch).map_err(user_error)
    })?;

    Ok(())
}

fn set_element_arg(ctx: &Context<'_>, index: usize) -> rusqlite::Result<Value> {
    match ctx.get_raw(index) {
        ValueRef::Integer(value) => Ok(Value::from(value)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(Value::from)
            .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err))),
        other => Err(rusqlite::Error::UserFunctionError(
            format!("unsupported set element type {}", other.data_type()).into(),
        )),
    }
}

/// Marks codec failures so they can be told apart from other statement errors.
const CODEC_FAILURE_PREFIX: &str = "codec failure: ";

fn user_error(err: CodecError) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(format!("{CODEC_FAILURE_PREFIX}{err}").into())
}

/// Recovers a codec failure raised by one of the registered functions.
///
/// SQLite reports a function error as a generic failure carrying only the
/// message, so the marker prefix is the only way back to the codec category.
pub(crate) fn codec_failure(err: &rusqlite::Error) -> Option<CodecError> {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message
            .strip_prefix(CODEC_FAILURE_PREFIX)
            .map(|detail| CodecError::InFunction(detail.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{codec_failure, register_functions};
    use crate::codec::CodecError;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn
    }

    fn eval<T: rusqlite::types::FromSql>(conn: &Connection, sql: &str) -> T {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn in_array_matches_integers_and_guest_text() {
        let conn = conn();
        assert!(eval::<bool>(&conn, r#"SELECT in_array('["guest",3]', 3)"#));
        assert!(eval::<bool>(&conn, r#"SELECT in_array('["guest",3]', 'guest')"#));
        assert!(!eval::<bool>(&conn, r#"SELECT in_array('["guest",3]', '3')"#));
    }

    #[test]
    fn add_and_remove_are_idempotent_in_sql() {
        let conn = conn();
        assert_eq!(
            eval::<String>(&conn, "SELECT add_to_array(add_to_array('[1]', 2), 2)"),
            "[1,2]"
        );
        assert_eq!(
            eval::<String>(&conn, "SELECT remove_from_array('[1,2]', 5)"),
            "[1,2]"
        );
    }

    #[test]
    fn merge_patch_deletes_null_keys() {
        let conn = conn();
        let merged: String = eval(
            &conn,
            r#"SELECT merge_patch('{"a":1,"b":2}', '{"b":null,"c":3}')"#,
        );
        let value: serde_json::Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value, serde_json::json!({ "a": 1, "c": 3 }));
    }

    #[test]
    fn corrupt_input_fails_with_a_recoverable_codec_error() {
        let conn = conn();
        let err = conn
            .query_row("SELECT in_array('not json', 1)", [], |row| row.get::<_, bool>(0))
            .unwrap_err();
        let codec = codec_failure(&err).unwrap();
        assert!(matches!(codec, CodecError::InFunction(ref message) if message.contains("corrupt")));

        let err = conn
            .query_row("SELECT add_to_array('{}', 1)", [], |row| row.get::<_, String>(0))
            .unwrap_err();
        assert!(codec_failure(&err).unwrap().to_string().contains("not a JSON array"));
    }

    #[test]
    fn unrelated_statement_errors_are_not_codec_failures() {
        let conn = conn();
        let err = conn
            .query_row("SELECT no_such_function(1)", [], |row| row.get::<_, i64>(0))
            .unwrap_err();
        assert!(codec_failure(&err).is_none());
    }
}
