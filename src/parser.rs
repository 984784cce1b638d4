//! Lightweight SQL inspection used to classify statements and fill scope fields.
//!
//! Nothing here parses SQL properly. The helpers look at the leading keyword and
//! use a handful of regexes, which is enough for the statements SeaORM renders.

use once_cell::sync::Lazy;
use regex::Regex;

/// Statement category derived from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Transaction,
    Other,
}

impl SqlOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT",
            SqlOperation::Insert => "INSERT",
            SqlOperation::Update => "UPDATE",
            SqlOperation::Delete => "DELETE",
            SqlOperation::Create => "CREATE",
            SqlOperation::Drop => "DROP",
            SqlOperation::Alter => "ALTER",
            SqlOperation::Truncate => "TRUNCATE",
            SqlOperation::Transaction => "TRANSACTION",
            SqlOperation::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static SELECT_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bFROM\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static INSERT_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bINSERT\s+INTO\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static UPDATE_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bUPDATE\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static DELETE_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bDELETE\s+FROM\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static DDL_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:CREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?|DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?|ALTER\s+TABLE\s+|TRUNCATE\s+(?:TABLE\s+)?)[`"\[]?(\w+)[`"\]]?"#,
    )
    .unwrap()
});

/// Return the first whitespace-separated token of the trimmed statement.
///
/// This is what ends up in the `db.method` tag. It is a heuristic: a leading
/// comment or a `WITH` clause is reported as-is.
pub fn leading_token(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("")
}

/// Classify a statement by its leading keyword.
pub fn parse_operation(sql: &str) -> SqlOperation {
    let token = leading_token(sql);
    let is = |keyword: &str| token.eq_ignore_ascii_case(keyword);

    if is("SELECT") || is("WITH") {
        SqlOperation::Select
    } else if is("INSERT") {
        SqlOperation::Insert
    } else if is("UPDATE") {
        SqlOperation::Update
    } else if is("DELETE") {
        SqlOperation::Delete
    } else if is("CREATE") {
        SqlOperation::Create
    } else if is("DROP") {
        SqlOperation::Drop
    } else if is("ALTER") {
        SqlOperation::Alter
    } else if is("TRUNCATE") {
        SqlOperation::Truncate
    } else if is("BEGIN") || is("START") || is("COMMIT") || is("ROLLBACK") || is("SAVEPOINT")
    {
        SqlOperation::Transaction
    } else {
        SqlOperation::Other
    }
}

/// Extract the primary table name from a statement, lowercased.
///
/// Returns `None` if the table cannot be determined.
pub fn extract_table(sql: &str) -> Option<String> {
    let regex = match parse_operation(sql) {
        SqlOperation::Select => &*SELECT_TABLE_REGEX,
        SqlOperation::Insert => &*INSERT_TABLE_REGEX,
        SqlOperation::Update => &*UPDATE_TABLE_REGEX,
        SqlOperation::Delete => &*DELETE_TABLE_REGEX,
        SqlOperation::Create
        | SqlOperation::Drop
        | SqlOperation::Alter
        | SqlOperation::Truncate => &*DDL_TABLE_REGEX,
        SqlOperation::Transaction | SqlOperation::Other => return None,
    };

    regex
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}
