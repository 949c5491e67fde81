//! Scoped "max + 1" order allocation.
//!
//! An [`OrderField`] names an integer column and the sibling columns that
//! partition it into scopes (e.g. modules within a course). New rows get the
//! next value in their scope unless an explicit value is supplied.
//!
//! Each scope also keeps a high-water mark in `order_marks`, so deleting the
//! highest-ordered row never lets its value be handed out again.

use rusqlite::{Connection, OptionalExtension, params, types::ToSql};

/// Describes an order column and the fields that scope it.
#[derive(Debug, Clone, Copy)]
pub struct OrderField {
    pub table: &'static str,
    pub column: &'static str,
    pub for_fields: &'static [&'static str],
}

/// Modules are ordered within their course.
pub const MODULE_ORDER: OrderField = OrderField {
    table: "modules",
    column: "order",
    for_fields: &["course_id"],
};

/// Contents are ordered within their module.
pub const CONTENT_ORDER: OrderField = OrderField {
    table: "contents",
    column: "order",
    for_fields: &["module_id"],
};

impl OrderField {
    /// Pick the order value for a new row in the scope identified by
    /// `scope` (one value per entry of `for_fields`, in the same order).
    ///
    /// An explicit value is kept as-is. Otherwise the result is `0` for a
    /// scope that has never held a row, or one past the larger of the current
    /// maximum and the scope's high-water mark. Either way the mark is raised
    /// to cover the returned value.
    pub fn assign(
        &self,
        conn: &Connection,
        explicit: Option<i64>,
        scope: &[&dyn ToSql],
    ) -> Result<i64, String> {
        let key = self.scope_key(conn, scope)?;
        let value = match explicit {
            Some(v) => v,
            None => {
                let current = self.current_max(conn, scope)?;
                let mark = self.high_water_mark(conn, &key)?;
                match current.max(mark) {
                    Some(last) => last.checked_add(1).ok_or_else(|| {
                        format!("invalid order: {} scope is exhausted", self.table)
                    })?,
                    None => 0,
                }
            }
        };
        self.raise_mark(conn, &key, value)?;
        tracing::debug!(table = self.table, scope = %key, order = value, "assigned order");
        Ok(value)
    }

    /// Record that `value` has been used in the given scope.
    pub fn observe(
        &self,
        conn: &Connection,
        scope: &[&dyn ToSql],
        value: i64,
    ) -> Result<(), String> {
        let key = self.scope_key(conn, scope)?;
        self.raise_mark(conn, &key, value)
    }

    /// Drop the high-water mark of a scope whose parent row is gone.
    pub fn forget(&self, conn: &Connection, scope: &[&dyn ToSql]) -> Result<(), String> {
        let key = self.scope_key(conn, scope)?;
        conn.execute("DELETE FROM order_marks WHERE scope = ?1", params![key])
            .map_err(|e| format!("failed to clear order mark: {e}"))?;
        Ok(())
    }

    /// Set explicit order values for rows of one scope.
    ///
    /// Every id must belong to the scope; the first that does not aborts with
    /// an error (callers run this inside a transaction).
    pub fn reorder(
        &self,
        conn: &Connection,
        scope: &[&dyn ToSql],
        moves: &[(i64, i64)],
    ) -> Result<(), String> {
        self.check_arity(scope)?;
        let id_param = scope.len() + 1;
        let order_param = scope.len() + 2;
        let scoped = if self.for_fields.is_empty() {
            format!(" WHERE id = ?{id_param}")
        } else {
            format!("{} AND id = ?{id_param}", self.where_clause())
        };
        let sql = format!(
            "UPDATE {} SET \"{}\" = ?{order_param}{scoped}",
            self.table, self.column
        );
        let mut top: Option<i64> = None;
        for (id, order) in moves {
            let mut values: Vec<&dyn ToSql> = scope.to_vec();
            values.push(id);
            values.push(order);
            let changed = conn
                .execute(&sql, values.as_slice())
                .map_err(|e| format!("reorder failed: {e}"))?;
            if changed == 0 {
                return Err(format!("{} row not found in scope: {id}", self.table));
            }
            top = top.max(Some(*order));
        }
        if let Some(v) = top {
            self.observe(conn, scope, v)?;
        }
        Ok(())
    }

    /// Highest order value currently present in the scope.
    pub fn current_max(
        &self,
        conn: &Connection,
        scope: &[&dyn ToSql],
    ) -> Result<Option<i64>, String> {
        self.check_arity(scope)?;
        let sql = format!(
            "SELECT MAX(\"{}\") FROM {}{}",
            self.column,
            self.table,
            self.where_clause()
        );
        conn.query_row(&sql, scope, |row| row.get::<_, Option<i64>>(0))
            .map_err(|e| format!("order query failed: {e}"))
    }

    fn where_clause(&self) -> String {
        if self.for_fields.is_empty() {
            return String::new();
        }
        let conds: Vec<String> = self
            .for_fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{f} = ?{}", i + 1))
            .collect();
        format!(" WHERE {}", conds.join(" AND "))
    }

    fn check_arity(&self, scope: &[&dyn ToSql]) -> Result<(), String> {
        if scope.len() != self.for_fields.len() {
            return Err(format!(
                "order scope for {} expects {} value(s), got {}",
                self.table,
                self.for_fields.len(),
                scope.len()
            ));
        }
        Ok(())
    }

    /// Stable textual key for a scope, e.g. `modules:course_id=3`.
    fn scope_key(&self, conn: &Connection, scope: &[&dyn ToSql]) -> Result<String, String> {
        self.check_arity(scope)?;
        let mut parts = Vec::with_capacity(scope.len());
        for (field, value) in self.for_fields.iter().zip(scope) {
            // Let SQLite render the bound value so any ToSql type works.
            let rendered: String = conn
                .query_row("SELECT CAST(?1 AS TEXT)", [*value], |row| row.get(0))
                .map_err(|e| format!("order scope failed: {e}"))?;
            parts.push(format!("{field}={rendered}"));
        }
        Ok(format!("{}:{}", self.table, parts.join(",")))
    }

    fn high_water_mark(&self, conn: &Connection, key: &str) -> Result<Option<i64>, String> {
        conn.query_row(
            "SELECT last_value FROM order_marks WHERE scope = ?1",
            params![key],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| format!("order query failed: {e}"))
    }

    fn raise_mark(&self, conn: &Connection, key: &str, value: i64) -> Result<(), String> {
        conn.execute(
            "INSERT INTO order_marks (scope, last_value) VALUES (?1, ?2)
             ON CONFLICT(scope) DO UPDATE SET last_value = MAX(last_value, excluded.last_value)",
            params![key, value],
        )
        .map_err(|e| format!("failed to record order: {e}"))?;
        Ok(())
    }
}
