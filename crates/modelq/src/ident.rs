//! SQL identifier handling.
//!
//! [`Ident`] is a possibly dotted identifier (`alias.column`). Parts are
//! either bare names matching `[A-Za-z_][A-Za-z0-9_$]*` or double-quoted
//! names (any characters except NUL, `""` escapes a quote). Rendering goes
//! through a [`Dialect`] so the same identifier quotes correctly everywhere.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};

/// Is `s` a bare identifier (`[A-Za-z_][A-Za-z0-9_$]*`)?
pub fn is_bare_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}

/// Validate a query alias (join alias or expression alias).
pub(crate) fn validate_alias(alias: &str) -> OrmResult<()> {
    if is_bare_ident(alias) {
        Ok(())
    } else {
        Err(OrmError::projection(format!(
            "alias '{alias}' must match [A-Za-z_][A-Za-z0-9_$]*"
        )))
    }
}

/// A SQL identifier: one or more dotted parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse `users`, `join_1.inv_id`, or `"CamelCase".id`.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::projection("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::projection(
                "identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::projection(format!(
                                "trailing '.' in identifier '{s}'"
                            )));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::projection(format!(
                            "expected '.' between identifier parts in '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(OrmError::projection(format!(
                                "unclosed quoted identifier in '{s}'"
                            )));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::projection("empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                name.push(c);
                chars.next();
            }
            if !is_bare_ident(&name) {
                return Err(OrmError::projection(format!(
                    "invalid identifier segment '{name}' in '{s}'"
                )));
            }
            parts.push(name);
        }

        if parts.is_empty() {
            return Err(OrmError::projection("empty identifier"));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// First part when there is more than one (`join_1` in `join_1.inv_id`).
    pub fn qualifier(&self) -> Option<&str> {
        (self.parts.len() > 1).then(|| self.parts[0].as_str())
    }

    /// Last part (`inv_id` in `join_1.inv_id`).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn write_sql(&self, dialect: &dyn Dialect, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&dialect.quote_identifier(part));
        }
    }

    /// Render with the dialect's quoting.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();
        self.write_sql(dialect, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn ident_simple() {
        let ident = Ident::parse("users").unwrap();
        assert_eq!(ident.to_sql(&Postgres), r#""users""#);
        assert_eq!(ident.qualifier(), None);
    }

    #[test]
    fn ident_dotted() {
        let ident = Ident::parse("join_1.inv_id").unwrap();
        assert_eq!(ident.qualifier(), Some("join_1"));
        assert_eq!(ident.name(), "inv_id");
        assert_eq!(ident.to_sql(&MySql), "`join_1`.`inv_id`");
    }

    #[test]
    fn ident_quoted_with_escape() {
        let ident = Ident::parse(r#""has""quote".id"#).unwrap();
        assert_eq!(ident.parts()[0], r#"has"quote"#);
        assert_eq!(ident.to_sql(&Postgres), r#""has""quote"."id""#);
    }

    #[test]
    fn ident_with_dollar() {
        assert!(Ident::parse("my_var$1").is_ok());
    }

    #[test]
    fn ident_rejects_bad_input() {
        for bad in ["", "1table", "my table", "schema..table", "schema.", r#""unclosed"#] {
            assert!(Ident::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn bare_ident_check() {
        assert!(is_bare_ident("join_1"));
        assert!(is_bare_ident("_x"));
        assert!(!is_bare_ident("join-1"));
        assert!(!is_bare_ident("join_1.x"));
        assert!(!is_bare_ident(""));
    }
}
