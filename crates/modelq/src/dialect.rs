//! SQL dialect adapters.
//!
//! A [`Dialect`] owns the small set of syntax differences the compiler cares
//! about: identifier quoting, placeholder style, LIMIT/OFFSET, and JOIN
//! keywords. The query builder and hydrator never branch on the dialect.
//!
//! | dialect    | quoting     | placeholder | pagination              |
//! |------------|-------------|-------------|-------------------------|
//! | [`MySql`]    | `` `id` `` | `?`         | `LIMIT off, n`          |
//! | [`Postgres`] | `"id"`     | `$1`        | `LIMIT n OFFSET off`    |
//! | [`Sqlite`]   | `"id"`     | `:p1`       | `LIMIT n OFFSET off`    |

use std::fmt;

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
        })
    }
}

/// How bind parameters are written into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Positional,
    /// `$1`, `$2`, ...
    Numbered,
    /// `:p1`, `:p2`, ...
    Named,
}

/// Render the placeholder for the 1-based parameter `index`.
pub fn render_placeholder(style: PlaceholderStyle, index: usize) -> String {
    match style {
        PlaceholderStyle::Positional => "?".to_string(),
        PlaceholderStyle::Numbered => format!("${index}"),
        PlaceholderStyle::Named => format!(":p{index}"),
    }
}

/// Parameter name used by [`PlaceholderStyle::Named`] for a 1-based index.
pub fn placeholder_name(index: usize) -> String {
    format!("p{index}")
}

/// Quote `ident` with `quote`, doubling embedded quote characters.
fn quote_with(ident: &str, quote: char) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for ch in ident.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}

/// Dialect capability set.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short dialect name used in logs (`mysql`, `postgres`, `sqlite`).
    fn name(&self) -> &'static str;

    /// Quote a single identifier part.
    fn quote_identifier(&self, ident: &str) -> String;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Render the pagination clause (without a leading space), or `None` when
    /// there is nothing to render.
    fn render_limit(&self, limit: Option<u64>, offset: u64) -> Option<String>;

    /// JOIN keyword for the given join type.
    fn render_join(&self, join_type: JoinType) -> &'static str {
        match join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl MySql {
    /// MySQL has no "no limit" keyword; the manual recommends the max u64.
    const NO_LIMIT: u64 = u64::MAX;
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`')
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn render_limit(&self, limit: Option<u64>, offset: u64) -> Option<String> {
        match (limit, offset) {
            (None, 0) => None,
            (Some(n), 0) => Some(format!("LIMIT {n}")),
            (Some(n), off) => Some(format!("LIMIT {off}, {n}")),
            (None, off) => Some(format!("LIMIT {off}, {}", Self::NO_LIMIT)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn render_limit(&self, limit: Option<u64>, offset: u64) -> Option<String> {
        match (limit, offset) {
            (None, 0) => None,
            (Some(n), 0) => Some(format!("LIMIT {n}")),
            (Some(n), off) => Some(format!("LIMIT {n} OFFSET {off}")),
            (None, off) => Some(format!("OFFSET {off}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Named
    }

    fn render_limit(&self, limit: Option<u64>, offset: u64) -> Option<String> {
        match (limit, offset) {
            (None, 0) => None,
            (Some(n), 0) => Some(format!("LIMIT {n}")),
            (Some(n), off) => Some(format!("LIMIT {n} OFFSET {off}")),
            // SQLite requires LIMIT before OFFSET; -1 means unbounded.
            (None, off) => Some(format!("LIMIT -1 OFFSET {off}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(MySql.quote_identifier("inv_id"), "`inv_id`");
        assert_eq!(MySql.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(Postgres.quote_identifier("join_1.inv_id"), r#""join_1.inv_id""#);
        assert_eq!(Sqlite.quote_identifier(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn placeholders() {
        assert_eq!(render_placeholder(MySql.placeholder_style(), 3), "?");
        assert_eq!(render_placeholder(Postgres.placeholder_style(), 3), "$3");
        assert_eq!(render_placeholder(Sqlite.placeholder_style(), 3), ":p3");
        assert_eq!(placeholder_name(3), "p3");
    }

    #[test]
    fn limit_forms() {
        let cases: [(&dyn Dialect, Option<u64>, u64, Option<&str>); 12] = [
            (&MySql, None, 0, None),
            (&MySql, Some(20), 0, Some("LIMIT 20")),
            (&MySql, Some(20), 40, Some("LIMIT 40, 20")),
            (&MySql, None, 5, Some("LIMIT 5, 18446744073709551615")),
            (&Postgres, None, 0, None),
            (&Postgres, Some(20), 0, Some("LIMIT 20")),
            (&Postgres, Some(20), 40, Some("LIMIT 20 OFFSET 40")),
            (&Postgres, None, 5, Some("OFFSET 5")),
            (&Sqlite, None, 0, None),
            (&Sqlite, Some(20), 0, Some("LIMIT 20")),
            (&Sqlite, Some(20), 40, Some("LIMIT 20 OFFSET 40")),
            (&Sqlite, None, 5, Some("LIMIT -1 OFFSET 5")),
        ];
        for (dialect, limit, offset, expected) in cases {
            assert_eq!(
                dialect.render_limit(limit, offset).as_deref(),
                expected,
                "{} {limit:?} {offset}",
                dialect.name()
            );
        }
    }

    #[test]
    fn join_keywords() {
        assert_eq!(Postgres.render_join(JoinType::Left), "LEFT JOIN");
        assert_eq!(MySql.render_join(JoinType::Inner), "INNER JOIN");
        assert_eq!(Sqlite.render_join(JoinType::Right), "RIGHT JOIN");
    }
}
