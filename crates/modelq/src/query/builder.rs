use super::column_ref::ColumnRef;
use super::expr::{Expr, parse_column};
use super::fragment::{count_placeholders, unknown_qualifiers};
use crate::dialect::JoinType;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::ident::{Ident, validate_alias};
use crate::manager::ModelManager;
use crate::metadata::MetadataProvider;
use crate::resultset::Resultset;
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;

/// Sort direction for [`QueryBuilder::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// One declared join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub alias: String,
    pub entity: &'static str,
    pub table: &'static str,
    pub join_type: JoinType,
    pub condition: String,
    /// Relationship on the root entity that receives this alias.
    pub relation: String,
}

/// Declarative query against entity `E`.
///
/// Every mutator validates its input immediately and returns
/// `OrmResult<&mut Self>`; a failed call leaves the builder unchanged.
///
/// ```
/// use modelq::{Entity, JoinType, OrmResult, RowSlice};
///
/// struct Invoice;
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoices";
///     const TABLE: &'static str = "co_invoices";
///     fn hydrate(_: &RowSlice<'_>) -> OrmResult<Self> { Ok(Invoice) }
/// }
///
/// struct Customer;
/// impl Entity for Customer {
///     const NAME: &'static str = "Customers";
///     const TABLE: &'static str = "co_customers";
///     fn hydrate(_: &RowSlice<'_>) -> OrmResult<Self> { Ok(Customer) }
/// }
///
/// let mut query = Customer::query();
/// query
///     .left_join::<Invoice>("Customers.cst_id = join_1.inv_cst_id", "join_1")?
///     .columns(&["Customers.*", "join_1.*"])?
///     .limit(20, 0)?;
/// assert_eq!(query.join_aliases().collect::<Vec<_>>(), ["join_1"]);
/// # Ok::<(), modelq::OrmError>(())
/// ```
pub struct QueryBuilder<E: Entity> {
    pub(crate) columns: Option<Vec<ColumnRef>>,
    pub(crate) joins: Vec<JoinSpec>,
    pub(crate) conditions: Option<Expr>,
    pub(crate) group_by: Vec<Ident>,
    pub(crate) order_by: Vec<(Ident, Order)>,
    pub(crate) distinct: bool,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: u64,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self {
            columns: None,
            joins: Vec::new(),
            conditions: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            distinct: false,
            limit: None,
            offset: 0,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            joins: self.joins.clone(),
            conditions: self.conditions.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            distinct: self.distinct,
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &E::NAME)
            .field("columns", &self.columns)
            .field("joins", &self.joins)
            .field("conditions", &self.conditions)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

fn non_negative(what: &str, value: i64) -> OrmResult<u64> {
    u64::try_from(value)
        .map_err(|_| OrmError::InvalidRange(format!("{what} must be >= 0, got {value}")))
}

impl<E: Entity> QueryBuilder<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root alias plus every join alias declared so far.
    pub(crate) fn known_aliases(&self) -> Vec<&str> {
        std::iter::once(E::NAME)
            .chain(self.joins.iter().map(|j| j.alias.as_str()))
            .collect()
    }

    /// Replace the projection.
    ///
    /// Entries are `*`, `alias.*`, `col`, `alias.col`, or any of those (or
    /// an expression) followed by `AS name`. Qualifiers must be the root
    /// entity name or an already declared join alias.
    pub fn columns<S: AsRef<str>>(&mut self, list: &[S]) -> OrmResult<&mut Self> {
        if list.is_empty() {
            return Err(OrmError::projection("column list cannot be empty"));
        }
        let known = self.known_aliases();
        let mut parsed = Vec::with_capacity(list.len());
        for entry in list {
            let column = ColumnRef::parse(entry.as_ref())?;
            if let Some(q) = column.qualifier() {
                if !known.contains(&q) {
                    return Err(OrmError::projection(format!(
                        "column '{}' references unknown alias '{q}'",
                        entry.as_ref()
                    )));
                }
            }
            if let ColumnRef::Expr { sql, .. } = &column {
                if let Some(q) = unknown_qualifiers(sql, &known).first() {
                    return Err(OrmError::projection(format!(
                        "expression '{}' references unknown alias '{q}'",
                        entry.as_ref()
                    )));
                }
            }
            parsed.push(column);
        }
        self.columns = Some(parsed);
        Ok(self)
    }

    /// Alias of [`columns`](Self::columns).
    pub fn set_columns<S: AsRef<str>>(&mut self, list: &[S]) -> OrmResult<&mut Self> {
        self.columns(list)
    }

    /// Add a join to entity `T` under `alias`.
    ///
    /// The join hydrates into the relationship named `alias` unless
    /// [`as_relation`](Self::as_relation) maps it elsewhere.
    pub fn join<T: Entity>(
        &mut self,
        join_type: JoinType,
        condition: &str,
        alias: &str,
    ) -> OrmResult<&mut Self> {
        validate_alias(alias)?;
        if alias == E::NAME || self.joins.iter().any(|j| j.alias == alias) {
            return Err(OrmError::DuplicateAlias(alias.to_string()));
        }
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(OrmError::condition(format!(
                "join '{alias}' needs an ON condition"
            )));
        }
        if count_placeholders(condition) > 0 {
            return Err(OrmError::condition(format!(
                "join condition for '{alias}' cannot bind parameters"
            )));
        }
        self.joins.push(JoinSpec {
            alias: alias.to_string(),
            entity: T::NAME,
            table: T::TABLE,
            join_type,
            condition: condition.to_string(),
            relation: alias.to_string(),
        });
        Ok(self)
    }

    pub fn inner_join<T: Entity>(&mut self, condition: &str, alias: &str) -> OrmResult<&mut Self> {
        self.join::<T>(JoinType::Inner, condition, alias)
    }

    pub fn left_join<T: Entity>(&mut self, condition: &str, alias: &str) -> OrmResult<&mut Self> {
        self.join::<T>(JoinType::Left, condition, alias)
    }

    pub fn right_join<T: Entity>(&mut self, condition: &str, alias: &str) -> OrmResult<&mut Self> {
        self.join::<T>(JoinType::Right, condition, alias)
    }

    /// Hydrate join `alias` into the relationship `relation`.
    pub fn as_relation(&mut self, alias: &str, relation: &str) -> OrmResult<&mut Self> {
        let join = self
            .joins
            .iter_mut()
            .find(|j| j.alias == alias)
            .ok_or_else(|| OrmError::projection(format!("unknown join alias '{alias}'")))?;
        join.relation = relation.to_string();
        Ok(self)
    }

    /// Set LIMIT and OFFSET. Negative values fail with `InvalidRange`.
    pub fn limit(&mut self, count: i64, offset: i64) -> OrmResult<&mut Self> {
        let count = non_negative("limit", count)?;
        let offset = non_negative("offset", offset)?;
        self.limit = Some(count);
        self.offset = offset;
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> OrmResult<&mut Self> {
        self.offset = non_negative("offset", offset)?;
        Ok(self)
    }

    /// Remove any limit; the offset is kept.
    pub fn no_limit(&mut self) -> &mut Self {
        self.limit = None;
        self
    }

    /// Replace the WHERE clause.
    pub fn where_expr(&mut self, expr: Expr) -> OrmResult<&mut Self> {
        expr.validate(&self.known_aliases())?;
        self.conditions = Some(expr);
        Ok(self)
    }

    /// AND an expression onto the WHERE clause.
    pub fn and_expr(&mut self, expr: Expr) -> OrmResult<&mut Self> {
        expr.validate(&self.known_aliases())?;
        self.conditions = Some(match self.conditions.take() {
            None => expr,
            Some(Expr::And(mut exprs)) => {
                exprs.push(expr);
                Expr::And(exprs)
            }
            Some(existing) => Expr::And(vec![existing, expr]),
        });
        Ok(self)
    }

    /// OR an expression onto the WHERE clause.
    pub fn or_expr(&mut self, expr: Expr) -> OrmResult<&mut Self> {
        expr.validate(&self.known_aliases())?;
        self.conditions = Some(match self.conditions.take() {
            None => expr,
            Some(Expr::Or(mut exprs)) => {
                exprs.push(expr);
                Expr::Or(exprs)
            }
            Some(existing) => Expr::Or(vec![existing, expr]),
        });
        Ok(self)
    }

    /// AND a `?` template condition.
    pub fn and_where(&mut self, template: &str, params: Vec<Value>) -> OrmResult<&mut Self> {
        self.and_expr(Expr::template(template, params))
    }

    /// OR a `?` template condition.
    pub fn or_where(&mut self, template: &str, params: Vec<Value>) -> OrmResult<&mut Self> {
        self.or_expr(Expr::template(template, params))
    }

    /// AND `column IN (values...)`. An empty list matches nothing.
    pub fn in_where<V: Into<Value>>(&mut self, column: &str, values: Vec<V>) -> OrmResult<&mut Self> {
        parse_column(column, &self.known_aliases())?;
        self.and_expr(Expr::in_list(column, values))
    }

    /// AND `column NOT IN (values...)`. An empty list matches everything.
    pub fn not_in_where<V: Into<Value>>(
        &mut self,
        column: &str,
        values: Vec<V>,
    ) -> OrmResult<&mut Self> {
        parse_column(column, &self.known_aliases())?;
        self.and_expr(Expr::not_in(column, values))
    }

    /// AND `column BETWEEN from AND to`.
    pub fn between_where(
        &mut self,
        column: &str,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> OrmResult<&mut Self> {
        self.and_expr(Expr::between(column, from, to))
    }

    pub fn order_by(&mut self, column: &str, order: Order) -> OrmResult<&mut Self> {
        let ident = parse_column(column, &self.known_aliases())?;
        self.order_by.push((ident, order));
        Ok(self)
    }

    pub fn group_by(&mut self, column: &str) -> OrmResult<&mut Self> {
        let ident = parse_column(column, &self.known_aliases())?;
        self.group_by.push(ident);
        Ok(self)
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn entity_name(&self) -> &'static str {
        E::NAME
    }

    /// Parsed projection, or `None` for the default `Entity.*`.
    pub fn column_refs(&self) -> Option<&[ColumnRef]> {
        self.columns.as_deref()
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn join_aliases(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|j| j.alias.as_str())
    }

    pub fn conditions(&self) -> Option<&Expr> {
        self.conditions.as_ref()
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> u64 {
        self.offset
    }

    /// Compile with the manager's dialect and metadata, run, and return the
    /// fully hydrated resultset.
    pub async fn execute<X: Executor>(&self, manager: &ModelManager<X>) -> OrmResult<Resultset<E>> {
        self.execute_with(manager.executor(), manager.metadata()).await
    }

    /// Lower-level [`execute`](Self::execute) with explicit collaborators.
    ///
    /// Relationship resolution and row hydration both happen here, so any
    /// error means no data was returned.
    pub async fn execute_with<X: Executor>(
        &self,
        executor: &X,
        metadata: &dyn MetadataProvider,
    ) -> OrmResult<Resultset<E>> {
        let stmt = self.compile(executor.dialect(), metadata)?;
        let cursor = executor.fetch(&stmt).await?;
        Resultset::load(cursor, &stmt.alias_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrate::RowSlice;

    struct Invoice;
    impl Entity for Invoice {
        const NAME: &'static str = "Invoices";
        const TABLE: &'static str = "co_invoices";
        fn hydrate(_: &RowSlice<'_>) -> OrmResult<Self> {
            Ok(Invoice)
        }
    }

    struct Customer;
    impl Entity for Customer {
        const NAME: &'static str = "Customers";
        const TABLE: &'static str = "co_customers";
        fn hydrate(_: &RowSlice<'_>) -> OrmResult<Self> {
            Ok(Customer)
        }
    }

    const ON: &str = "Customers.cst_id = join_1.inv_cst_id";

    #[test]
    fn duplicate_alias_rejected() {
        let mut q = Customer::query();
        q.left_join::<Invoice>(ON, "join_1").unwrap();
        let err = q.inner_join::<Invoice>(ON, "join_1").unwrap_err();
        assert!(matches!(err, OrmError::DuplicateAlias(ref a) if a == "join_1"));
        assert_eq!(q.joins().len(), 1);

        let err = q.left_join::<Invoice>(ON, "Customers").unwrap_err();
        assert!(matches!(err, OrmError::DuplicateAlias(_)));
    }

    #[test]
    fn bad_alias_is_projection_error() {
        let err = Customer::query()
            .left_join::<Invoice>(ON, "join-1")
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidProjection(_)));
    }

    #[test]
    fn expression_must_follow_its_join() {
        let mut q = Customer::query();
        let err = q.columns(&["COUNT(join_1.inv_id) AS n"]).unwrap_err();
        assert!(matches!(err, OrmError::InvalidProjection(_)), "{err}");
        assert!(q.column_refs().is_none());

        q.left_join::<Invoice>(ON, "join_1").unwrap();
        q.columns(&["COUNT(join_1.inv_id) AS n", "public.f(cst_id) AS f"])
            .unwrap();
    }

    #[test]
    fn negative_range_rejected() {
        let mut q = Customer::query();
        assert!(matches!(q.limit(-1, 0), Err(OrmError::InvalidRange(_))));
        assert!(matches!(q.limit(10, -5), Err(OrmError::InvalidRange(_))));
        assert!(matches!(q.offset(-1), Err(OrmError::InvalidRange(_))));
        assert_eq!(q.limit_value(), None);
        assert_eq!(q.offset_value(), 0);

        q.limit(20, 40).unwrap();
        assert_eq!((q.limit_value(), q.offset_value()), (Some(20), 40));
    }

    #[test]
    fn columns_require_declared_aliases() {
        let mut q = Customer::query();
        let err = q.columns(&["Customers.*", "join_1.*"]).unwrap_err();
        assert!(matches!(err, OrmError::InvalidProjection(_)));
        assert!(q.column_refs().is_none());

        q.left_join::<Invoice>(ON, "join_1").unwrap();
        q.columns(&["Customers.*", "join_1.*"]).unwrap();
        assert_eq!(q.column_refs().map(<[_]>::len), Some(2));
    }

    #[test]
    fn empty_or_malformed_columns_rejected() {
        let mut q = Customer::query();
        assert!(matches!(
            q.columns::<&str>(&[]),
            Err(OrmError::InvalidProjection(_))
        ));
        assert!(matches!(
            q.columns(&["COUNT(*)"]),
            Err(OrmError::InvalidProjection(_))
        ));
    }

    #[test]
    fn as_relation_requires_known_join() {
        let mut q = Customer::query();
        assert!(q.as_relation("join_1", "invoice").is_err());
        q.left_join::<Invoice>(ON, "join_1")
            .unwrap()
            .as_relation("join_1", "invoice")
            .unwrap();
        assert_eq!(q.joins()[0].relation, "invoice");
    }

    #[test]
    fn conditions_accumulate() {
        let mut q = Customer::query();
        q.and_where("cst_status_flag = ?", vec![1.into()])
            .unwrap()
            .or_where("cst_id > ?", vec![10.into()])
            .unwrap();
        assert!(matches!(q.conditions(), Some(Expr::Or(v)) if v.len() == 2));

        let err = q.and_where("a = ? AND b = ?", vec![1.into()]).unwrap_err();
        assert!(matches!(err, OrmError::InvalidCondition(_)));
        assert!(matches!(q.conditions(), Some(Expr::Or(_))));
    }

    #[test]
    fn join_condition_cannot_bind() {
        let err = Customer::query()
            .left_join::<Invoice>("join_1.inv_cst_id = ?", "join_1")
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidCondition(_)));
    }
}
