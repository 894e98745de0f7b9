//! Condition trees for WHERE clauses.
//!
//! [`Expr`] composes comparisons, null checks, IN lists, BETWEEN, `?`
//! templates and raw SQL under AND/OR/NOT. Placeholders are numbered at
//! compile time in statement order, so the same tree renders correctly for
//! every dialect.

use super::fragment::{Fragment, ParamSink, count_placeholders};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::value::Value;

/// Expression node for building WHERE clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// Simple comparison: column op ?
    Compare {
        column: String,
        op: &'static str,
        value: Value,
    },

    /// NULL check: column IS NULL or column IS NOT NULL
    NullCheck { column: String, is_null: bool },

    /// IN list: column IN (?, ?, ...) or column NOT IN (...)
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },

    /// BETWEEN: column BETWEEN ? AND ?
    Between {
        column: String,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// Template with `?` placeholders, e.g. `join_1.inv_status_flag = ?`.
    Template { sql: String, params: Vec<Value> },

    /// Raw SQL fragment without parameters.
    Raw(String),

    /// Always true (used for empty NOT IN lists).
    True,

    /// Always false (used for empty IN lists).
    False,
}

macro_rules! compare_ctor {
    ($($(#[$doc:meta])* $fn_name:ident => $op:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(column: impl Into<String>, value: impl Into<Value>) -> Self {
                Expr::Compare {
                    column: column.into(),
                    op: $op,
                    value: value.into(),
                }
            }
        )*
    };
}

impl Expr {
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    compare_ctor! {
        /// column = value
        eq => "=",
        /// column != value
        ne => "!=",
        /// column > value
        gt => ">",
        /// column >= value
        gte => ">=",
        /// column < value
        lt => "<",
        /// column <= value
        lte => "<=",
        /// column LIKE pattern
        like => "LIKE",
        /// column NOT LIKE pattern
        not_like => "NOT LIKE",
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// column IN (values...). An empty list is always false.
    pub fn in_list<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// column NOT IN (values...). An empty list is always true.
    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    /// Template expression with `?` placeholders.
    ///
    /// ```
    /// use modelq::Expr;
    ///
    /// let e = Expr::template("inv_status_flag = ? OR inv_total > ?", vec![1.into(), 100.into()]);
    /// assert!(!e.is_empty());
    /// ```
    pub fn template(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Expr::Template {
            sql: sql.into(),
            params,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Check if this expression is empty (contains no conditions).
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Check column references and template arity without rendering.
    ///
    /// Qualified columns must name one of `aliases`; templates must have as
    /// many `?` placeholders as parameters.
    pub fn validate(&self, aliases: &[&str]) -> OrmResult<()> {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => {
                exprs.iter().try_for_each(|e| e.validate(aliases))
            }
            Expr::Not(inner) => inner.validate(aliases),
            Expr::Compare { column, .. }
            | Expr::NullCheck { column, .. }
            | Expr::InList { column, .. }
            | Expr::Between { column, .. } => parse_column(column, aliases).map(|_| ()),
            Expr::Template { sql, params } => {
                let expected = count_placeholders(sql);
                if expected != params.len() {
                    return Err(OrmError::condition(format!(
                        "'{sql}' has {expected} placeholder(s) but {} parameter(s) were given",
                        params.len()
                    )));
                }
                Ok(())
            }
            Expr::Raw(sql) => {
                if count_placeholders(sql) > 0 {
                    return Err(OrmError::condition(format!(
                        "raw fragment '{sql}' cannot bind parameters; use a template"
                    )));
                }
                Ok(())
            }
            Expr::True | Expr::False => Ok(()),
        }
    }

    /// Render SQL, binding values into `sink` in order.
    pub(crate) fn build(&self, frag: &Fragment<'_>, sink: &mut ParamSink) -> OrmResult<String> {
        Ok(match self {
            Expr::And(exprs) => join_group(exprs, " AND ", frag, sink, |e| {
                matches!(e, Expr::Or(_))
            })?,
            Expr::Or(exprs) => join_group(exprs, " OR ", frag, sink, |e| {
                matches!(e, Expr::And(_))
            })?,
            Expr::Not(inner) => {
                let sql = inner.build(frag, sink)?;
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { column, op, value } => {
                let column = frag.column(column)?;
                format!("{column} {op} {}", sink.push(value.clone()))
            }
            Expr::NullCheck { column, is_null } => {
                let column = frag.column(column)?;
                if *is_null {
                    format!("{column} IS NULL")
                } else {
                    format!("{column} IS NOT NULL")
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let column = frag.column(column)?;
                if values.is_empty() {
                    return Ok(if *negated { "1=1" } else { "1=0" }.to_string());
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| sink.push(v.clone())).collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{column} {op} ({})", placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let column = frag.column(column)?;
                let from = sink.push(from.clone());
                let to = sink.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{column} {op} {from} AND {to}")
            }
            Expr::Template { sql, params } => frag.render(sql, params, sink)?,
            Expr::Raw(sql) => frag.render(sql, &[], sink)?,
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        })
    }
}

fn join_group(
    exprs: &[Expr],
    sep: &str,
    frag: &Fragment<'_>,
    sink: &mut ParamSink,
    needs_parens: impl Fn(&Expr) -> bool,
) -> OrmResult<String> {
    let grouped = exprs.len() > 1;
    let mut parts = Vec::with_capacity(exprs.len());
    for e in exprs.iter().filter(|e| !e.is_empty()) {
        let sql = e.build(frag, sink)?;
        if sql.is_empty() {
            continue;
        }
        // Templates and raw fragments may carry their own AND/OR.
        let opaque = matches!(e, Expr::Template { .. } | Expr::Raw(_));
        if needs_parens(e) || (grouped && opaque) {
            parts.push(format!("({sql})"));
        } else {
            parts.push(sql);
        }
    }
    Ok(parts.join(sep))
}

/// Parse a condition column: `col` or `alias.col` with a known alias.
pub(crate) fn parse_column(column: &str, aliases: &[&str]) -> OrmResult<Ident> {
    let ident = Ident::parse(column)?;
    if ident.parts().len() > 2 {
        return Err(OrmError::projection(format!(
            "column '{column}' has more than one qualifier"
        )));
    }
    if let Some(q) = ident.qualifier() {
        if !aliases.contains(&q) {
            return Err(OrmError::projection(format!(
                "column '{column}' references unknown alias '{q}'"
            )));
        }
    }
    Ok(ident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Dialect, MySql, Postgres};

    const ALIASES: &[&str] = &["Customers", "join_1"];

    fn render(expr: &Expr, dialect: &dyn Dialect) -> (String, Vec<Value>) {
        let mut sink = ParamSink::new(dialect.placeholder_style());
        let sql = expr.build(&Fragment::new(dialect, ALIASES), &mut sink).unwrap();
        (sql, sink.finish().0)
    }

    #[test]
    fn numbers_nested_groups_in_order() {
        let expr = Expr::and(vec![
            Expr::eq("Customers.cst_status_flag", 1),
            Expr::or(vec![
                Expr::in_list("join_1.inv_status_flag", vec![0, 1]),
                Expr::between("join_1.inv_total", 10, 20),
            ]),
            Expr::is_not_null("join_1.inv_title"),
        ]);
        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(
            sql,
            r#""Customers"."cst_status_flag" = $1 AND ("join_1"."inv_status_flag" IN ($2, $3) OR "join_1"."inv_total" BETWEEN $4 AND $5) AND "join_1"."inv_title" IS NOT NULL"#
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[3], Value::Int(10));
    }

    #[test]
    fn not_and_template() {
        let expr = Expr::not(Expr::template(
            "join_1.inv_title LIKE ?",
            vec!["%x%".into()],
        ));
        let (sql, params) = render(&expr, &MySql);
        assert_eq!(sql, "NOT (`join_1`.`inv_title` LIKE ?)");
        assert_eq!(params, vec![Value::Text("%x%".into())]);
    }

    #[test]
    fn grouped_templates_keep_their_precedence() {
        let expr = Expr::and(vec![
            Expr::template("join_1.inv_id = ? OR join_1.inv_id = ?", vec![1.into(), 2.into()]),
            Expr::eq("Customers.cst_id", 3),
        ]);
        let (sql, _) = render(&expr, &Postgres);
        assert_eq!(
            sql,
            r#"("join_1"."inv_id" = $1 OR "join_1"."inv_id" = $2) AND "Customers"."cst_id" = $3"#
        );
    }

    #[test]
    fn empty_lists_collapse() {
        assert_eq!(Expr::in_list::<i64>("a", vec![]), Expr::False);
        assert_eq!(Expr::not_in::<i64>("a", vec![]), Expr::True);
        assert!(Expr::and(vec![Expr::or(vec![])]).is_empty());
    }

    #[test]
    fn validate_checks_aliases_and_arity() {
        assert!(Expr::eq("join_1.inv_id", 1).validate(ALIASES).is_ok());
        assert!(matches!(
            Expr::eq("join_9.inv_id", 1).validate(ALIASES),
            Err(OrmError::InvalidProjection(_))
        ));
        assert!(matches!(
            Expr::template("a = ? AND b = ?", vec![1.into()]).validate(ALIASES),
            Err(OrmError::InvalidCondition(_))
        ));
        assert!(matches!(
            Expr::raw("a = ?").validate(ALIASES),
            Err(OrmError::InvalidCondition(_))
        ));
    }
}
