use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, is_bare_ident, validate_alias};

/// One parsed projection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// `*` or `alias.*`
    Wildcard { qualifier: Option<String> },
    /// `col`, `alias.col`, optionally `... AS name`
    Column {
        qualifier: Option<String>,
        name: String,
        alias: Option<String>,
    },
    /// Any other SQL expression. Always aliased.
    Expr { sql: String, alias: String },
}

impl ColumnRef {
    /// Parse a projection entry such as `join_1.*`, `Customers.cst_id AS id`
    /// or `COUNT(*) AS total`.
    pub fn parse(entry: &str) -> OrmResult<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(OrmError::projection("empty column entry"));
        }

        let (body, alias) = split_alias(entry);
        if body.is_empty() {
            return Err(OrmError::projection(format!(
                "column entry '{entry}' has an alias but no expression"
            )));
        }

        if body == "*" {
            return Self::wildcard(None, alias, entry);
        }
        if let Some(qualifier) = body.strip_suffix(".*") {
            if is_bare_ident(qualifier) {
                return Self::wildcard(Some(qualifier.to_string()), alias, entry);
            }
        }

        if let Ok(ident) = Ident::parse(body) {
            if ident.parts().len() <= 2 {
                return Ok(ColumnRef::Column {
                    qualifier: ident.qualifier().map(str::to_string),
                    name: ident.name().to_string(),
                    alias: alias.map(str::to_string),
                });
            }
        }

        match alias {
            Some(alias) => Ok(ColumnRef::Expr {
                sql: body.to_string(),
                alias: alias.to_string(),
            }),
            None => Err(OrmError::projection(format!(
                "expression '{body}' requires an alias (`... AS name`)"
            ))),
        }
    }

    fn wildcard(qualifier: Option<String>, alias: Option<&str>, entry: &str) -> OrmResult<Self> {
        if alias.is_some() {
            return Err(OrmError::projection(format!(
                "wildcard '{entry}' cannot be aliased"
            )));
        }
        Ok(ColumnRef::Wildcard { qualifier })
    }

    /// Alias qualifier, or `None` for the root.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            ColumnRef::Wildcard { qualifier } | ColumnRef::Column { qualifier, .. } => {
                qualifier.as_deref()
            }
            ColumnRef::Expr { .. } => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ColumnRef::Wildcard { .. })
    }
}

/// Split off a trailing `AS alias` (case-insensitive). A trailing segment
/// that is not a bare identifier belongs to the expression, e.g. the type in
/// `CAST(x AS int)`.
fn split_alias(entry: &str) -> (&str, Option<&str>) {
    let lower = entry.to_ascii_lowercase();
    if let Some(pos) = lower.rfind(" as ") {
        let alias = entry[pos + 4..].trim();
        if validate_alias(alias).is_ok() {
            return (entry[..pos].trim(), Some(alias));
        }
    }
    (entry, None)
}
