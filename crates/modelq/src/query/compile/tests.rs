use super::*;
use crate::column::ColumnType;
use crate::dialect::{MySql, Postgres, Sqlite};
use crate::hydrate::RowSlice;
use crate::metadata::MemoryMetadata;
use crate::query::{Expr, Order};

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

fn metadata() -> MemoryMetadata {
    let col = |name: &str, ty| ColumnDescriptor::builder(name, ty).build().unwrap();
    MemoryMetadata::new()
        .with_table(
            "co_customers",
            vec![
                col("cst_id", ColumnType::Integer),
                col("cst_status_flag", ColumnType::TinyInteger),
                col("cst_name_last", ColumnType::Varchar),
            ],
        )
        .unwrap()
        .with_table(
            "co_invoices",
            vec![
                col("inv_id", ColumnType::Integer),
                col("inv_cst_id", ColumnType::Integer),
                col("inv_title", ColumnType::Varchar),
            ],
        )
        .unwrap()
}

fn joined() -> QueryBuilder<Customer> {
    let mut q = Customer::query();
    q.left_join::<Invoice>(ON, "join_1")
        .unwrap()
        .columns(&["Customers.*", "join_1.*"])
        .unwrap()
        .limit(20, 0)
        .unwrap();
    q
}

#[test]
fn default_projection_is_root_wildcard() {
    let stmt = Customer::query().compile(&Postgres, &metadata()).unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT "Customers"."cst_id", "Customers"."cst_status_flag", "Customers"."cst_name_last" FROM "co_customers" AS "Customers""#
    );
    assert_eq!(&*stmt.header(), ["cst_id", "cst_status_flag", "cst_name_last"]);
    assert!(stmt.params.is_empty());
    assert_eq!(stmt.dialect, "postgres");
}

#[test]
fn joined_wildcard_is_prefixed() {
    let stmt = joined().compile(&Postgres, &metadata()).unwrap();
    assert_eq!(
        stmt.sql,
        concat!(
            r#"SELECT "Customers"."cst_id", "Customers"."cst_status_flag", "Customers"."cst_name_last", "#,
            r#""join_1"."inv_id" AS "join_1.inv_id", "join_1"."inv_cst_id" AS "join_1.inv_cst_id", "#,
            r#""join_1"."inv_title" AS "join_1.inv_title" "#,
            r#"FROM "co_customers" AS "Customers" "#,
            r#"LEFT JOIN "co_invoices" AS "join_1" ON "Customers"."cst_id" = "join_1"."inv_cst_id" "#,
            r#"LIMIT 20"#
        )
    );
    assert_eq!(stmt.limit, Some(20));
    assert_eq!(stmt.offset, 0);
    let joined: Vec<_> = stmt.columns.iter().filter(|c| c.alias == "join_1").collect();
    assert_eq!(joined.len(), 3);
    assert_eq!(joined[0].source.as_deref(), Some("inv_id"));
    assert_eq!(stmt.alias_map.get("join_1").unwrap().relation, "join_1");
}

#[test]
fn same_query_renders_per_dialect() {
    let mut q = joined();
    q.limit(20, 40)
        .unwrap()
        .and_where("join_1.inv_title = ?", vec!["x".into()])
        .unwrap();
    let meta = metadata();

    let my = q.compile(&MySql, &meta).unwrap();
    assert!(my.sql.contains("LEFT JOIN `co_invoices` AS `join_1` ON `Customers`.`cst_id` = `join_1`.`inv_cst_id`"));
    assert!(my.sql.ends_with("WHERE `join_1`.`inv_title` = ? LIMIT 40, 20"));
    assert!(my.param_names.is_empty());

    let pg = q.compile(&Postgres, &meta).unwrap();
    assert!(pg.sql.ends_with(r#"WHERE "join_1"."inv_title" = $1 LIMIT 20 OFFSET 40"#));

    let lite = q.compile(&Sqlite, &meta).unwrap();
    assert!(lite.sql.ends_with(r#"WHERE "join_1"."inv_title" = :p1 LIMIT 20 OFFSET 40"#));
    assert_eq!(lite.param_names, ["p1"]);
    assert_eq!(lite.params, vec![Value::Text("x".into())]);
}

#[test]
fn explicit_columns_and_expressions() {
    let mut q = Customer::query();
    q.inner_join::<Invoice>(ON, "join_1")
        .unwrap()
        .columns(&[
            "cst_id",
            "Customers.cst_name_last AS last_name",
            "join_1.inv_title",
            "COUNT(join_1.inv_id) AS invoices",
        ])
        .unwrap()
        .group_by("Customers.cst_id")
        .unwrap()
        .order_by("cst_name_last", Order::Desc)
        .unwrap();
    let stmt = q.compile(&Postgres, &metadata()).unwrap();
    assert_eq!(
        stmt.sql,
        concat!(
            r#"SELECT "Customers"."cst_id", "Customers"."cst_name_last" AS "last_name", "#,
            r#""join_1"."inv_title" AS "join_1.inv_title", COUNT("join_1"."inv_id") AS "invoices" "#,
            r#"FROM "co_customers" AS "Customers" "#,
            r#"INNER JOIN "co_invoices" AS "join_1" ON "Customers"."cst_id" = "join_1"."inv_cst_id" "#,
            r#"GROUP BY "Customers"."cst_id" ORDER BY "cst_name_last" DESC"#
        )
    );
    assert_eq!(
        &*stmt.header(),
        ["cst_id", "last_name", "join_1.inv_title", "invoices"]
    );
    assert_eq!(stmt.columns[3].source, None);
}

#[test]
fn placeholders_numbered_in_statement_order() {
    let mut q = joined();
    q.where_expr(Expr::and(vec![
        Expr::eq("Customers.cst_status_flag", 1),
        Expr::in_list("join_1.inv_id", vec![4, 5]),
    ]))
    .unwrap()
    .between_where("join_1.inv_cst_id", 1, 9)
    .unwrap();
    let stmt = q.compile(&Postgres, &metadata()).unwrap();
    assert!(stmt.sql.contains(
        r#"WHERE "Customers"."cst_status_flag" = $1 AND "join_1"."inv_id" IN ($2, $3) AND "join_1"."inv_cst_id" BETWEEN $4 AND $5"#
    ));
    assert_eq!(
        stmt.params,
        [1, 4, 5, 1, 9].map(Value::from).to_vec()
    );
}

#[test]
fn offset_without_limit_normalizes() {
    let mut q = Customer::query();
    q.columns(&["cst_id"]).unwrap().offset(5).unwrap();
    let meta = metadata();
    assert!(q.compile(&MySql, &meta).unwrap().sql.ends_with("LIMIT 5, 18446744073709551615"));
    assert!(q.compile(&Postgres, &meta).unwrap().sql.ends_with("OFFSET 5"));
    assert!(q.compile(&Sqlite, &meta).unwrap().sql.ends_with("LIMIT -1 OFFSET 5"));
}

#[test]
fn unknown_column_is_projection_error() {
    let mut q = Customer::query();
    q.columns(&["cst_missing"]).unwrap();
    let err = q.compile(&Postgres, &metadata()).unwrap_err();
    assert!(matches!(err, OrmError::InvalidProjection(_)));
}

#[test]
fn duplicate_output_is_projection_error() {
    let mut q = Customer::query();
    q.columns(&["Customers.*", "cst_id"]).unwrap();
    let err = q.compile(&Postgres, &metadata()).unwrap_err();
    assert!(matches!(err, OrmError::InvalidProjection(ref m) if m.contains("cst_id")));
}

#[test]
fn unknown_table_is_metadata_error() {
    struct Ghost;
    impl Entity for Ghost {
        const NAME: &'static str = "Ghosts";
        const TABLE: &'static str = "nowhere";
        fn hydrate(_: &RowSlice<'_>) -> OrmResult<Self> {
            Ok(Ghost)
        }
    }
    let err = Ghost::query().compile(&Postgres, &metadata()).unwrap_err();
    assert!(matches!(err, OrmError::Metadata(_)));
}

#[test]
fn distinct_prefix() {
    let mut q = Customer::query();
    q.distinct(true).columns(&["cst_status_flag"]).unwrap();
    let stmt = q.compile(&Sqlite, &metadata()).unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT DISTINCT "Customers"."cst_status_flag" FROM "co_customers" AS "Customers""#
    );
}
