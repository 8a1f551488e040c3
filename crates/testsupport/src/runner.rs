//! SQL script execution with plain-text output, for quick assertions over
//! the `database` facade without hand-rolling a `Database`/`Transaction`
//! pair in every test.

use crate::context::TestContext;
use common::BeeDbResult;
use database::QueryResult;

/// Run a SQL script (one or more `;`-separated statements) against a fresh,
/// isolated database and return human-readable output for each statement.
///
/// # Example
///
/// ```no_run
/// use testsupport::prelude::*;
///
/// let output = run_sql_script(r#"
///     CREATE TABLE users (id BIGINT NOT NULL, name CHAR(32) NOT NULL);
///     INSERT INTO users (id, name) VALUES (1, 'alice');
///     SELECT id, name FROM users;
/// "#).unwrap();
/// ```
pub fn run_sql_script(sql: &str) -> BeeDbResult<String> {
    let mut ctx = TestContext::new()?;
    run_sql_script_with_context(sql, &mut ctx)
}

/// Run a SQL script against an existing [`TestContext`], so multiple scripts
/// can share catalog/table state across calls.
pub fn run_sql_script_with_context(sql: &str, ctx: &mut TestContext) -> BeeDbResult<String> {
    let mut output = String::new();

    for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let rendered = match ctx.run(stmt) {
            Ok(result) => render_result(&result),
            Err(e) => format!("Error: {e}"),
        };
        if !rendered.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&rendered);
        }
    }

    Ok(output)
}

fn render_result(result: &QueryResult) -> String {
    match result {
        QueryResult::Count { affected } => format!("{affected} row(s) affected."),
        QueryResult::Rows { schema, rows } => {
            let mut out = String::new();
            out.push_str(&schema.join(" | "));
            for row in rows {
                out.push('\n');
                let cells: Vec<String> = row.values.iter().map(|v| format!("{v:?}")).collect();
                out.push_str(&cells.join(" | "));
            }
            out
        }
    }
}
