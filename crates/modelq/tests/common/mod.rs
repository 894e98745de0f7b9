#![allow(dead_code)]

use modelq::{
    ColumnDescriptor, ColumnType, CompiledStatement, Dialect, Entity, Executor, MemoryMetadata,
    OrmResult, Postgres, RelationMap, RowCursor, RowSlice, Value,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ON_INVOICE: &str = "Customers.cst_id = join_1.inv_cst_id";

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub inv_id: i64,
    pub inv_cst_id: i64,
    pub inv_title: Option<String>,
}

impl Entity for Invoice {
    const NAME: &'static str = "Invoices";
    const TABLE: &'static str = "co_invoices";

    fn hydrate(row: &RowSlice<'_>) -> OrmResult<Self> {
        Ok(Self {
            inv_id: row.get("inv_id")?,
            inv_cst_id: row.get("inv_cst_id")?,
            inv_title: row.get("inv_title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Customer {
    pub cst_id: i64,
    pub cst_status_flag: i64,
    pub cst_name_last: Option<String>,
    pub invoice: Option<Invoice>,
    pub invoices: Vec<Invoice>,
}

impl Entity for Customer {
    const NAME: &'static str = "Customers";
    const TABLE: &'static str = "co_customers";

    fn hydrate(row: &RowSlice<'_>) -> OrmResult<Self> {
        Ok(Self {
            cst_id: row.get("cst_id")?,
            cst_status_flag: row.try_get::<i64>("cst_status_flag")?.unwrap_or_default(),
            cst_name_last: row.try_get::<Option<String>>("cst_name_last")?.flatten(),
            ..Self::default()
        })
    }

    fn relations() -> RelationMap<Self> {
        RelationMap::new()
            .has_one::<Invoice>("invoice", |c: &mut Customer, inv| c.invoice = Some(inv))
            .has_many::<Invoice>("invoices", |c: &mut Customer, inv| c.invoices.push(inv))
    }
}

pub fn metadata() -> MemoryMetadata {
    let build = |b: modelq::ColumnDescriptorBuilder| b.build().unwrap();
    MemoryMetadata::new()
        .with_table(
            "co_customers",
            vec![
                build(
                    ColumnDescriptor::builder("cst_id", ColumnType::Integer)
                        .primary(true)
                        .auto_increment(true),
                ),
                build(ColumnDescriptor::builder("cst_status_flag", ColumnType::TinyInteger)),
                build(
                    ColumnDescriptor::builder("cst_name_last", ColumnType::Varchar)
                        .size(100)
                        .nullable(true),
                ),
            ],
        )
        .unwrap()
        .with_table(
            "co_invoices",
            vec![
                build(ColumnDescriptor::builder("inv_id", ColumnType::Integer).primary(true)),
                build(ColumnDescriptor::builder("inv_cst_id", ColumnType::Integer)),
                build(
                    ColumnDescriptor::builder("inv_title", ColumnType::Varchar)
                        .size(100)
                        .nullable(true),
                ),
            ],
        )
        .unwrap()
}

type Script = Box<dyn Fn(&CompiledStatement) -> OrmResult<Vec<Vec<Value>>> + Send + Sync>;

/// In-memory executor that answers every statement from a script and keeps
/// what it was asked to run.
pub struct ScriptedExecutor {
    dialect: &'static dyn Dialect,
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
    statements: Mutex<Vec<CompiledStatement>>,
}

impl ScriptedExecutor {
    pub fn new<F>(dialect: &'static dyn Dialect, script: F) -> Self
    where
        F: Fn(&CompiledStatement) -> OrmResult<Vec<Vec<Value>>> + Send + Sync + 'static,
    {
        Self {
            dialect,
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn postgres<F>(script: F) -> Self
    where
        F: Fn(&CompiledStatement) -> OrmResult<Vec<Vec<Value>>> + Send + Sync + 'static,
    {
        Self::new(&Postgres, script)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_statement(&self) -> Option<CompiledStatement> {
        self.statements.lock().unwrap().last().cloned()
    }
}

impl Executor for ScriptedExecutor {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    async fn fetch(&self, stmt: &CompiledStatement) -> OrmResult<RowCursor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.statements.lock().unwrap().push(stmt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let rows = (self.script)(stmt)?;
        Ok(RowCursor::from_rows(stmt.header(), rows))
    }
}

/// Value of header column `column` for customer `id`. Customers with even
/// ids have exactly one invoice; joined columns are NULL for the others.
pub fn customer_value(id: i64, column: &str) -> Value {
    let (joined, name) = match column.split_once('.') {
        Some((_, name)) => (true, name),
        None => (false, column),
    };
    if joined && id % 2 != 0 {
        return Value::Null;
    }
    match name {
        "cst_id" => Value::Int(id),
        "cst_status_flag" => Value::Int(id % 2),
        "cst_name_last" => Value::Text(format!("Last{id}")),
        "inv_id" => Value::Int(id * 10),
        "inv_cst_id" => Value::Int(id),
        "inv_title" => Value::Text(format!("Invoice {id}")),
        _ => Value::Null,
    }
}

/// Script serving `total` customers, honouring the statement's limit and
/// offset the way a server would.
pub fn customers(
    total: i64,
) -> impl Fn(&CompiledStatement) -> OrmResult<Vec<Vec<Value>>> + Send + Sync + 'static {
    move |stmt| {
        let header = stmt.header();
        let start = stmt.offset as i64 + 1;
        let end = match stmt.limit {
            Some(limit) => (start + limit as i64 - 1).min(total),
            None => total,
        };
        Ok((start..=end)
            .map(|id| header.iter().map(|c| customer_value(id, c)).collect())
            .collect())
    }
}
