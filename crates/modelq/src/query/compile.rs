use super::alias::{AliasMap, AliasTarget};
use super::builder::QueryBuilder;
use super::column_ref::ColumnRef;
use super::fragment::{Fragment, ParamSink};
use crate::column::ColumnDescriptor;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::metadata::MetadataProvider;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One column of the compiled projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Result column name: `col` for the root, `alias.col` for joins.
    pub name: String,
    /// Alias the column hydrates into.
    pub alias: String,
    /// Underlying table column, `None` for expressions.
    pub source: Option<String>,
}

/// Dialect-specific SQL plus everything needed to run and hydrate it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    /// Bind values in placeholder order.
    pub params: Vec<Value>,
    /// Placeholder names (`p1`, `p2`, ...) for named-placeholder dialects;
    /// empty otherwise.
    pub param_names: Vec<String>,
    pub columns: Vec<OutputColumn>,
    pub alias_map: AliasMap,
    pub limit: Option<u64>,
    pub offset: u64,
    /// [`Dialect::name`] the statement was compiled for.
    pub dialect: &'static str,
}

impl CompiledStatement {
    /// Output column names in projection order.
    pub fn header(&self) -> Arc<[String]> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

struct Projection<'a> {
    dialect: &'a dyn Dialect,
    metadata: &'a dyn MetadataProvider,
    tables: HashMap<&'static str, Arc<[ColumnDescriptor]>>,
    select: Vec<String>,
    columns: Vec<OutputColumn>,
    seen: HashSet<String>,
}

impl<'a> Projection<'a> {
    fn describe(&mut self, table: &'static str) -> OrmResult<Arc<[ColumnDescriptor]>> {
        if let Some(cols) = self.tables.get(table) {
            return Ok(Arc::clone(cols));
        }
        let cols = self.metadata.describe_columns(table)?;
        self.tables.insert(table, Arc::clone(&cols));
        Ok(cols)
    }

    fn push(&mut self, sql: String, column: OutputColumn) -> OrmResult<()> {
        if !self.seen.insert(column.name.clone()) {
            return Err(OrmError::projection(format!(
                "duplicate output column '{}'",
                column.name
            )));
        }
        self.select.push(sql);
        self.columns.push(column);
        Ok(())
    }

    /// `"alias"."col"`, aliased to `output` when the names differ.
    fn column(&mut self, target: &AliasTarget, name: &str, rename: Option<&str>) -> OrmResult<()> {
        let local = rename.unwrap_or(name);
        let output = if target.is_root() {
            local.to_string()
        } else {
            format!("{}.{}", target.alias, local)
        };
        let mut sql = format!(
            "{}.{}",
            self.dialect.quote_identifier(&target.alias),
            self.dialect.quote_identifier(name)
        );
        if output != name {
            sql.push_str(" AS ");
            sql.push_str(&self.dialect.quote_identifier(&output));
        }
        self.push(
            sql,
            OutputColumn {
                name: output,
                alias: target.alias.clone(),
                source: Some(name.to_string()),
            },
        )
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Compile to SQL for `dialect`, expanding wildcards from `metadata`.
    ///
    /// Pure: no I/O beyond the metadata lookup.
    pub fn compile(
        &self,
        dialect: &dyn Dialect,
        metadata: &dyn MetadataProvider,
    ) -> OrmResult<CompiledStatement> {
        let mut alias_map = AliasMap::new(E::NAME, E::TABLE);
        for join in &self.joins {
            alias_map.insert(AliasTarget::join(
                join.alias.clone(),
                join.entity,
                join.table,
                join.join_type,
                join.relation.clone(),
            ));
        }
        let aliases = self.known_aliases();
        let frag = Fragment::new(dialect, &aliases);
        let mut sink = ParamSink::new(dialect.placeholder_style());

        let mut projection = Projection {
            dialect,
            metadata,
            tables: HashMap::new(),
            select: Vec::new(),
            columns: Vec::new(),
            seen: HashSet::new(),
        };
        let default = [ColumnRef::Wildcard { qualifier: None }];
        for column in self.columns.as_deref().unwrap_or(&default) {
            match column {
                ColumnRef::Wildcard { qualifier } => {
                    let target = resolve(&alias_map, qualifier.as_deref())?;
                    for desc in projection.describe(target.table)?.iter() {
                        projection.column(target, desc.name(), None)?;
                    }
                }
                ColumnRef::Column {
                    qualifier,
                    name,
                    alias,
                } => {
                    let target = resolve(&alias_map, qualifier.as_deref())?;
                    if !projection.describe(target.table)?.iter().any(|c| c.name() == name) {
                        return Err(OrmError::projection(format!(
                            "table '{}' (alias '{}') has no column '{name}'",
                            target.table, target.alias
                        )));
                    }
                    projection.column(target, name, alias.as_deref())?;
                }
                ColumnRef::Expr { sql, alias } => {
                    let rendered = frag.render(sql, &[], &mut sink)?;
                    projection.push(
                        format!("{rendered} AS {}", dialect.quote_identifier(alias)),
                        OutputColumn {
                            name: alias.clone(),
                            alias: E::NAME.to_string(),
                            source: None,
                        },
                    )?;
                }
            }
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&projection.select.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&dialect.quote_identifier(E::TABLE));
        sql.push_str(" AS ");
        sql.push_str(&dialect.quote_identifier(E::NAME));

        for join in &self.joins {
            let on = frag.render(&join.condition, &[], &mut sink)?;
            sql.push(' ');
            sql.push_str(dialect.render_join(join.join_type));
            sql.push(' ');
            sql.push_str(&dialect.quote_identifier(join.table));
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(&join.alias));
            sql.push_str(" ON ");
            sql.push_str(&on);
        }

        if let Some(expr) = &self.conditions {
            let where_sql = expr.build(&frag, &mut sink)?;
            if !where_sql.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&where_sql);
            }
        }

        if !self.group_by.is_empty() {
            let cols: Vec<String> = self.group_by.iter().map(|c| c.to_sql(dialect)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if !self.order_by.is_empty() {
            let cols: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, order)| format!("{} {}", c.to_sql(dialect), order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&cols.join(", "));
        }

        if let Some(clause) = dialect.render_limit(self.limit, self.offset) {
            sql.push(' ');
            sql.push_str(&clause);
        }

        let (params, param_names) = sink.finish();
        tracing::debug!(
            target: "modelq.query",
            entity = E::NAME,
            dialect = dialect.name(),
            columns = projection.columns.len(),
            param_count = params.len(),
            sql = %sql,
            "compiled query"
        );

        Ok(CompiledStatement {
            sql,
            params,
            param_names,
            columns: projection.columns,
            alias_map,
            limit: self.limit,
            offset: self.offset,
            dialect: dialect.name(),
        })
    }
}

fn resolve<'m>(aliases: &'m AliasMap, qualifier: Option<&str>) -> OrmResult<&'m AliasTarget> {
    let prefix = qualifier.unwrap_or_default();
    aliases
        .get(prefix)
        .ok_or_else(|| OrmError::projection(format!("unknown alias '{prefix}'")))
}

#[cfg(test)]
mod tests;
