//! SQL generation for schema-free tables
//!
//! Column types are inferred from the JSON values being written. Values are always
//! bound as text and cast to the column's type inside the statement, so one prepared
//! statement serves rows of any shape. When later rows no longer fit a column's type
//! the column is widened rather than the write failing.

use crate::adapters::database::ROW_ID_COLUMN;
use crate::domain::Record;
use chrono::DateTime;
use serde_json::Value;
use sha1::{Digest, Sha1};

/// Longest identifier PostgreSQL keeps without truncation (`NAMEDATALEN - 1`)
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// Hex digits of the digest appended to shortened identifiers
const SHORT_HASH_LEN: usize = 8;

/// Column type inferred for a new column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Timestamp,
    Json,
    Text,
}

impl ColumnType {
    /// SQL type name
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Json => "JSONB",
            ColumnType::Text => "TEXT",
        }
    }

    /// Catalog (`udt_name`) spelling, used in parameter casts
    pub fn udt(self) -> &'static str {
        match self {
            ColumnType::BigInt => "int8",
            ColumnType::Double => "float8",
            ColumnType::Boolean => "bool",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Json => "jsonb",
            ColumnType::Text => "text",
        }
    }

    /// Type named by a catalog `udt_name`, if it is one Bazaar creates
    pub fn from_udt(udt: &str) -> Option<Self> {
        match udt {
            "int8" => Some(ColumnType::BigInt),
            "float8" => Some(ColumnType::Double),
            "bool" => Some(ColumnType::Boolean),
            "timestamptz" => Some(ColumnType::Timestamp),
            "jsonb" => Some(ColumnType::Json),
            "text" => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// Narrowest type that holds every non-null value of `column`
    ///
    /// Columns that are missing or null in every row default to text.
    pub fn infer(rows: &[Record], column: &str) -> Self {
        Self::infer_present(rows, column).unwrap_or(ColumnType::Text)
    }

    /// Like [`ColumnType::infer`], but `None` when `column` has no non-null value
    pub fn infer_present(rows: &[Record], column: &str) -> Option<Self> {
        let mut inferred: Option<ColumnType> = None;

        for value in rows.iter().filter_map(|r| r.get(column)) {
            let this = match value {
                Value::Null => continue,
                Value::Bool(_) => ColumnType::Boolean,
                Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::BigInt,
                Value::Number(_) => ColumnType::Double,
                Value::String(s) if DateTime::parse_from_rfc3339(s).is_ok() => {
                    ColumnType::Timestamp
                }
                Value::String(_) => ColumnType::Text,
                Value::Array(_) | Value::Object(_) => ColumnType::Json,
            };

            inferred = Some(match (inferred, this) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::BigInt), ColumnType::Double)
                | (Some(ColumnType::Double), ColumnType::BigInt) => ColumnType::Double,
                _ => ColumnType::Text,
            });
        }

        inferred
    }

    /// Type an existing column of this type must become to also hold `incoming` values
    ///
    /// Returns `None` when the current type already accepts them.
    pub fn widen_for(self, incoming: ColumnType) -> Option<ColumnType> {
        match (self, incoming) {
            (current, new) if current == new => None,
            (ColumnType::Text, _) | (ColumnType::Double, ColumnType::BigInt) => None,
            (ColumnType::BigInt, ColumnType::Double) => Some(ColumnType::Double),
            _ => Some(ColumnType::Text),
        }
    }
}

/// Column name as stored, shortened to fit PostgreSQL's identifier limit
///
/// Names longer than [`MAX_IDENTIFIER_BYTES`] keep a prefix and gain a short SHA-1
/// suffix of the full name, so distinct long names stay distinct and the same name
/// always maps to the same column.
pub fn column_name(raw: &str) -> String {
    if raw.len() <= MAX_IDENTIFIER_BYTES {
        return raw.to_string();
    }

    let digest: String = Sha1::digest(raw.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();

    let mut cut = MAX_IDENTIFIER_BYTES - SHORT_HASH_LEN - 1;
    while !raw.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}", &raw[..cut], &digest[..SHORT_HASH_LEN])
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` with the identity column followed by `columns`
pub fn create_table(table: &str, columns: &[(String, ColumnType)], if_not_exists: bool) -> String {
    let mut defs = vec![format!("{} BIGSERIAL PRIMARY KEY", quote_ident(ROW_ID_COLUMN))];
    defs.extend(
        columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql())),
    );
    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(table),
        defs.join(", ")
    )
}

/// `ALTER TABLE ... ADD COLUMN IF NOT EXISTS`
pub fn add_column(table: &str, column: &str, ty: ColumnType) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        quote_ident(table),
        quote_ident(column),
        ty.sql()
    )
}

/// `ALTER TABLE ... ALTER COLUMN ... TYPE`, converting existing values
pub fn alter_column_type(table: &str, column: &str, ty: ColumnType) -> String {
    let column = quote_ident(column);
    format!(
        "ALTER TABLE {} ALTER COLUMN {column} TYPE {} USING ({column})::{}",
        quote_ident(table),
        ty.sql(),
        ty.sql()
    )
}

/// Parameterised insert returning the identity column
///
/// `columns` pairs each column with the type name its text parameter is cast to.
pub fn insert_returning(table: &str, columns: &[(String, String)]) -> String {
    if columns.is_empty() {
        return format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quote_ident(table),
            quote_ident(ROW_ID_COLUMN)
        );
    }

    let names: Vec<String> = columns.iter().map(|(c, _)| quote_ident(c)).collect();
    let params: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (_, ty))| format!("${}::text::{}", i + 1, ty))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote_ident(table),
        names.join(", "),
        params.join(", "),
        quote_ident(ROW_ID_COLUMN)
    )
}

/// Delete rows whose `column` falls on a day within `$1..=$2`
///
/// Both bounds are bound as `YYYY-MM-DD` text. Date and timestamp columns are compared
/// as dates. Any other column is compared on its leading ISO date, and values that do
/// not start with one are left alone instead of failing the cast.
pub fn delete_date_range(table: &str, column: &str, udt: &str) -> String {
    let column = quote_ident(column);
    match udt {
        "date" | "timestamp" | "timestamptz" => format!(
            "DELETE FROM {} WHERE ({column})::date BETWEEN $1::text::date AND $2::text::date",
            quote_ident(table)
        ),
        _ => format!(
            "DELETE FROM {} WHERE ({column})::text ~ '^[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}' \
             AND left(({column})::text, 10) BETWEEN $1 AND $2",
            quote_ident(table)
        ),
    }
}

/// Delete every row, keeping the table and its identity sequence
pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}

/// Delete rows whose `column`, as text, is in the array `$1`
pub fn delete_ids(table: &str, column: &str) -> String {
    format!(
        "DELETE FROM {} WHERE ({})::text = ANY($1)",
        quote_ident(table),
        quote_ident(column)
    )
}
