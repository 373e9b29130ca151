use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Result};

use crate::models::{
    Category, FixedCostRecord, NoteFolder, NoteRecord, TransactionRecord, User,
};

pub type DbPool = Pool<SqliteConnectionManager>;

pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Alimentação",
    "Moradia",
    "Transporte",
    "Utilidades",
    "Trabalho",
    "Saúde",
    "Software",
    "Lazer",
    "Outro",
];

pub fn init_db(path: &Path) -> DbPool {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::new(manager).expect("db pool");
    {
        let conn = pool.get().expect("db connection");
        run_migrations(&conn).expect("db migrations");
    }
    pool
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            occurred_on TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
            amount_cents INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS fixed_costs (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            base_id TEXT NOT NULL,
            month TEXT NOT NULL,
            name TEXT NOT NULL,
            due_on TEXT NOT NULL DEFAULT '',
            amount_cents INTEGER NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS note_folders (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            folder_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(folder_id) REFERENCES note_folders(id) ON DELETE CASCADE
        );
        ",
    )?;
    ensure_column(conn, "users", "display_name", "TEXT")?;
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, column_type: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(());
        }
    }
    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN {column} {column_type}"),
        [],
    )?;
    Ok(())
}

// ── users & sessions ────────────────────────────────────────────────

pub fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![email, password_hash, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_credentials(conn: &Connection, email: &str) -> Result<Option<(i64, String)>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, password_hash
        FROM users
        WHERE email = ?1
        ",
    )?;
    let mut rows = stmt.query(params![email])?;
    if let Some(row) = rows.next()? {
        Ok(Some((row.get(0)?, row.get(1)?)))
    } else {
        Ok(None)
    }
}

pub fn update_password(conn: &Connection, user_id: i64, password_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}

pub fn update_display_name(conn: &Connection, user_id: i64, display_name: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET display_name = ?1 WHERE id = ?2",
        params![display_name, user_id],
    )?;
    Ok(())
}

pub fn create_session(conn: &Connection, user_id: i64, token: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, token, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, token, created_at],
    )?;
    Ok(())
}

pub fn user_by_session(conn: &Connection, token: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "
        SELECT u.id, u.email, u.display_name
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.token = ?1
        ",
    )?;
    let mut rows = stmt.query(params![token])?;
    if let Some(row) = rows.next()? {
        Ok(Some(User {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
        }))
    } else {
        Ok(None)
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn session_count(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

pub fn delete_sessions_for_user(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

pub fn prune_sessions(conn: &Connection, user_id: i64, keep: i64) -> Result<()> {
    conn.execute(
        "
        DELETE FROM sessions
        WHERE user_id = ?1
          AND id NOT IN (
            SELECT id
            FROM sessions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
          )
        ",
        params![user_id, keep],
    )?;
    Ok(())
}

// ── categories ──────────────────────────────────────────────────────

pub fn list_categories(conn: &Connection, user_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, name
        FROM categories
        WHERE user_id = ?1
        ORDER BY name
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_category(conn: &Connection, user_id: i64, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO categories (user_id, name) VALUES (?1, ?2)",
        params![user_id, name],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, user_id: i64, name: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM categories WHERE user_id = ?1 AND name = ?2",
        params![user_id, name],
    )?;
    Ok(())
}

pub fn category_count(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

/// Lists the user's categories, seeding the default set first if the
/// user has none yet.
pub fn ensure_categories(conn: &Connection, user_id: i64) -> Result<Vec<Category>> {
    let list = list_categories(conn, user_id)?;
    if !list.is_empty() {
        return Ok(list);
    }
    for name in DEFAULT_CATEGORIES {
        insert_category(conn, user_id, name)?;
    }
    list_categories(conn, user_id)
}

// ── transactions ────────────────────────────────────────────────────

pub fn list_transactions_between(
    conn: &Connection,
    user_id: i64,
    start: &str,
    end: &str,
) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, occurred_on, description, category, kind, amount_cents
        FROM transactions
        WHERE user_id = ?1 AND occurred_on >= ?2 AND occurred_on <= ?3
        ORDER BY occurred_on DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], map_transaction_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_all_transactions(conn: &Connection, user_id: i64) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, occurred_on, description, category, kind, amount_cents
        FROM transactions
        WHERE user_id = ?1
        ORDER BY occurred_on DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], map_transaction_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn map_transaction_row(row: &rusqlite::Row<'_>) -> Result<TransactionRecord> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        occurred_on: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        kind: row.get(4)?,
        amount_cents: row.get(5)?,
    })
}

pub fn transaction_by_id(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> Result<Option<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, occurred_on, description, category, kind, amount_cents
        FROM transactions
        WHERE user_id = ?1 AND id = ?2
        ",
    )?;
    let mut rows = stmt.query(params![user_id, id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(TransactionRecord {
            id: row.get(0)?,
            occurred_on: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            kind: row.get(4)?,
            amount_cents: row.get(5)?,
        }))
    } else {
        Ok(None)
    }
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: i64,
    occurred_on: &str,
    description: &str,
    category: &str,
    kind: &str,
    amount_cents: i64,
) -> Result<()> {
    conn.execute(
        "
        INSERT INTO transactions (user_id, occurred_on, description, category, kind, amount_cents)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![user_id, occurred_on, description, category, kind, amount_cents],
    )?;
    Ok(())
}

pub fn update_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
    occurred_on: &str,
    description: &str,
    category: &str,
    kind: &str,
    amount_cents: i64,
) -> Result<()> {
    conn.execute(
        "
        UPDATE transactions
        SET occurred_on = ?3, description = ?4, category = ?5, kind = ?6, amount_cents = ?7
        WHERE user_id = ?1 AND id = ?2
        ",
        params![user_id, id, occurred_on, description, category, kind, amount_cents],
    )?;
    Ok(())
}

pub fn delete_transaction(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM transactions WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )?;
    Ok(())
}

// ── fixed costs ─────────────────────────────────────────────────────

pub fn list_fixed_cost_months(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "
        SELECT month
        FROM fixed_costs
        WHERE user_id = ?1
        GROUP BY month
        ORDER BY month
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_fixed_costs(
    conn: &Connection,
    user_id: i64,
    month: &str,
) -> Result<Vec<FixedCostRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, base_id, month, name, due_on, amount_cents, is_paid
        FROM fixed_costs
        WHERE user_id = ?1 AND month = ?2
        ORDER BY due_on, id
        ",
    )?;
    let rows = stmt.query_map(params![user_id, month], map_fixed_cost_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_all_fixed_costs(conn: &Connection, user_id: i64) -> Result<Vec<FixedCostRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, base_id, month, name, due_on, amount_cents, is_paid
        FROM fixed_costs
        WHERE user_id = ?1
        ORDER BY month, due_on, id
        ",
    )?;
    let rows = stmt.query_map(params![user_id], map_fixed_cost_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn map_fixed_cost_row(row: &rusqlite::Row<'_>) -> Result<FixedCostRecord> {
    Ok(FixedCostRecord {
        id: row.get(0)?,
        base_id: row.get(1)?,
        month: row.get(2)?,
        name: row.get(3)?,
        due_on: row.get(4)?,
        amount_cents: row.get(5)?,
        is_paid: row.get::<_, i64>(6)? != 0,
    })
}

pub fn fixed_cost_by_id(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> Result<Option<FixedCostRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, base_id, month, name, due_on, amount_cents, is_paid
        FROM fixed_costs
        WHERE user_id = ?1 AND id = ?2
        ",
    )?;
    let mut rows = stmt.query(params![user_id, id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(FixedCostRecord {
            id: row.get(0)?,
            base_id: row.get(1)?,
            month: row.get(2)?,
            name: row.get(3)?,
            due_on: row.get(4)?,
            amount_cents: row.get(5)?,
            is_paid: row.get::<_, i64>(6)? != 0,
        }))
    } else {
        Ok(None)
    }
}

pub fn insert_fixed_cost(
    conn: &Connection,
    user_id: i64,
    base_id: &str,
    month: &str,
    name: &str,
    due_on: &str,
    amount_cents: i64,
    is_paid: bool,
) -> Result<()> {
    conn.execute(
        "
        INSERT INTO fixed_costs (user_id, base_id, month, name, due_on, amount_cents, is_paid)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![user_id, base_id, month, name, due_on, amount_cents, is_paid as i64],
    )?;
    Ok(())
}

pub fn update_fixed_cost(
    conn: &Connection,
    user_id: i64,
    id: i64,
    name: &str,
    due_on: &str,
    amount_cents: i64,
) -> Result<()> {
    conn.execute(
        "
        UPDATE fixed_costs
        SET name = ?3, due_on = ?4, amount_cents = ?5
        WHERE user_id = ?1 AND id = ?2
        ",
        params![user_id, id, name, due_on, amount_cents],
    )?;
    Ok(())
}

pub fn toggle_fixed_cost_paid(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    conn.execute(
        "
        UPDATE fixed_costs
        SET is_paid = 1 - is_paid
        WHERE user_id = ?1 AND id = ?2
        ",
        params![user_id, id],
    )?;
    Ok(())
}

pub fn delete_fixed_cost(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM fixed_costs WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )?;
    Ok(())
}

/// Removes a recurring cost from `from_month` onwards, across every
/// generated month sharing its `base_id`.
pub fn delete_fixed_costs_forward(
    conn: &Connection,
    user_id: i64,
    base_id: &str,
    from_month: &str,
) -> Result<()> {
    conn.execute(
        "
        DELETE FROM fixed_costs
        WHERE user_id = ?1 AND base_id = ?2 AND month >= ?3
        ",
        params![user_id, base_id, from_month],
    )?;
    Ok(())
}

pub fn month_fixed_cost_total(conn: &Connection, user_id: i64, month: &str) -> Result<i64> {
    conn.query_row(
        "
        SELECT COALESCE(SUM(amount_cents), 0)
        FROM fixed_costs
        WHERE user_id = ?1 AND month = ?2
        ",
        params![user_id, month],
        |row| row.get(0),
    )
}

// ── note folders & notes ────────────────────────────────────────────

pub fn list_note_folders(conn: &Connection, user_id: i64) -> Result<Vec<NoteFolder>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, name, created_at
        FROM note_folders
        WHERE user_id = ?1
        ORDER BY created_at, id
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(NoteFolder {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_note_folder(
    conn: &Connection,
    user_id: i64,
    name: &str,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO note_folders (user_id, name, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, name, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_note_folder(conn: &Connection, user_id: i64, id: i64, name: &str) -> Result<()> {
    conn.execute(
        "UPDATE note_folders SET name = ?3 WHERE user_id = ?1 AND id = ?2",
        params![user_id, id, name],
    )?;
    Ok(())
}

/// Notes in the folder go with it, via the ON DELETE CASCADE constraint.
pub fn delete_note_folder(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM note_folders WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )?;
    Ok(())
}

pub fn note_folder_count(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM note_folders WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

pub fn list_notes_in_folder(
    conn: &Connection,
    user_id: i64,
    folder_id: i64,
) -> Result<Vec<NoteRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, folder_id, title, content, updated_at
        FROM notes
        WHERE user_id = ?1 AND folder_id = ?2
        ORDER BY updated_at DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id, folder_id], map_note_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_all_notes(conn: &Connection, user_id: i64) -> Result<Vec<NoteRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, folder_id, title, content, updated_at
        FROM notes
        WHERE user_id = ?1
        ORDER BY updated_at DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], map_note_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn map_note_row(row: &rusqlite::Row<'_>) -> Result<NoteRecord> {
    Ok(NoteRecord {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn note_by_id(conn: &Connection, user_id: i64, id: i64) -> Result<Option<NoteRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, folder_id, title, content, updated_at
        FROM notes
        WHERE user_id = ?1 AND id = ?2
        ",
    )?;
    let mut rows = stmt.query(params![user_id, id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(NoteRecord {
            id: row.get(0)?,
            folder_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            updated_at: row.get(4)?,
        }))
    } else {
        Ok(None)
    }
}

pub fn note_count(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM notes WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

pub fn insert_note(
    conn: &Connection,
    user_id: i64,
    folder_id: i64,
    title: &str,
    content: &str,
    updated_at: &str,
) -> Result<i64> {
    conn.execute(
        "
        INSERT INTO notes (user_id, folder_id, title, content, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![user_id, folder_id, title, content, updated_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_note(
    conn: &Connection,
    user_id: i64,
    id: i64,
    title: &str,
    content: &str,
    updated_at: &str,
) -> Result<()> {
    conn.execute(
        "
        UPDATE notes
        SET title = ?3, content = ?4, updated_at = ?5
        WHERE user_id = ?1 AND id = ?2
        ",
        params![user_id, id, title, content, updated_at],
    )?;
    Ok(())
}

pub fn delete_note(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM notes WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        run_migrations(&conn).expect("migrations");
        conn
    }

    fn test_user(conn: &Connection, email: &str) -> i64 {
        insert_user(conn, email, "hash", "2026-01-01T00:00:00Z").expect("insert user")
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).expect("second run");
    }

    #[test]
    fn queries_are_scoped_per_user() {
        let conn = test_conn();
        let alice = test_user(&conn, "alice@example.com");
        let bob = test_user(&conn, "bob@example.com");

        insert_transaction(&conn, alice, "2026-08-01", "Mercado", "Alimentação", "expense", 12050)
            .unwrap();
        insert_transaction(&conn, bob, "2026-08-01", "Salário", "Trabalho", "income", 500000)
            .unwrap();

        let for_alice = list_all_transactions(&conn, alice).unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].description, "Mercado");

        // Cross-user mutation is a no-op.
        delete_transaction(&conn, alice, for_alice[0].id).unwrap();
        assert_eq!(list_all_transactions(&conn, alice).unwrap().len(), 0);
        assert_eq!(list_all_transactions(&conn, bob).unwrap().len(), 1);
    }

    #[test]
    fn date_range_listing_is_inclusive() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        for (date, desc) in [
            ("2026-07-31", "before"),
            ("2026-08-01", "first"),
            ("2026-08-15", "middle"),
            ("2026-08-31", "last"),
            ("2026-09-01", "after"),
        ] {
            insert_transaction(&conn, user, date, desc, "Outro", "expense", 100).unwrap();
        }

        let rows = list_transactions_between(&conn, user, "2026-08-01", "2026-08-31").unwrap();
        let descs: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descs, vec!["last", "middle", "first"]);
    }

    #[test]
    fn ensure_categories_seeds_defaults_once() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");

        let seeded = ensure_categories(&conn, user).unwrap();
        assert_eq!(seeded.len(), DEFAULT_CATEGORIES.len());

        delete_category(&conn, user, "Outro").unwrap();
        let again = ensure_categories(&conn, user).unwrap();
        assert_eq!(again.len(), DEFAULT_CATEGORIES.len() - 1);
    }

    #[test]
    fn duplicate_category_is_ignored() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        insert_category(&conn, user, "Viagem").unwrap();
        insert_category(&conn, user, "Viagem").unwrap();
        assert_eq!(category_count(&conn, user).unwrap(), 1);
    }

    #[test]
    fn folder_delete_cascades_to_notes() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        let folder = insert_note_folder(&conn, user, "Ideias", "2026-08-01T12:00:00Z").unwrap();
        insert_note(&conn, user, folder, "Nova Nota", "", "2026-08-01T12:00:00Z").unwrap();
        insert_note(&conn, user, folder, "Outra", "texto", "2026-08-01T12:05:00Z").unwrap();

        delete_note_folder(&conn, user, folder).unwrap();
        assert_eq!(note_count(&conn, user).unwrap(), 0);
    }

    #[test]
    fn delete_forward_keeps_past_months() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        let base = "base-1";
        for month in ["2026-06", "2026-07", "2026-08"] {
            insert_fixed_cost(&conn, user, base, month, "Aluguel", "", 150000, false).unwrap();
        }
        insert_fixed_cost(&conn, user, "base-2", "2026-07", "Internet", "", 9990, false).unwrap();

        delete_fixed_costs_forward(&conn, user, base, "2026-07").unwrap();

        let remaining = list_all_fixed_costs(&conn, user).unwrap();
        let months: Vec<(&str, &str)> = remaining
            .iter()
            .map(|c| (c.name.as_str(), c.month.as_str()))
            .collect();
        assert_eq!(months, vec![("Aluguel", "2026-06"), ("Internet", "2026-07")]);
    }

    #[test]
    fn toggle_paid_flips_flag() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        insert_fixed_cost(&conn, user, "base-1", "2026-08", "Luz", "2026-08-10", 22000, false)
            .unwrap();
        let cost = &list_fixed_costs(&conn, user, "2026-08").unwrap()[0];

        toggle_fixed_cost_paid(&conn, user, cost.id).unwrap();
        assert!(fixed_cost_by_id(&conn, user, cost.id).unwrap().unwrap().is_paid);
        toggle_fixed_cost_paid(&conn, user, cost.id).unwrap();
        assert!(!fixed_cost_by_id(&conn, user, cost.id).unwrap().unwrap().is_paid);
    }

    #[test]
    fn prune_sessions_keeps_newest() {
        let conn = test_conn();
        let user = test_user(&conn, "alice@example.com");
        for i in 0..7 {
            let token = format!("token-{i}");
            let created = format!("2026-08-01T00:0{i}:00Z");
            create_session(&conn, user, &token, &created).unwrap();
        }
        prune_sessions(&conn, user, 5).unwrap();
        assert_eq!(session_count(&conn, user).unwrap(), 5);
        assert!(user_by_session(&conn, "token-6").unwrap().is_some());
        assert!(user_by_session(&conn, "token-0").unwrap().is_none());
    }
}
