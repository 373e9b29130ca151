use std::collections::HashMap;

use chrono::Local;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::current_month;
use crate::db;
use crate::error::AppError;
use crate::models::{Category, FixedCostRecord, NoteFolder, NoteRecord, TransactionRecord};

/// Shape of the browser-era export: the localStorage payloads the old
/// client kept per user, pasted in as one JSON document.
#[derive(Deserialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub fixed_costs: Vec<LegacyFixedCost>,
    #[serde(default)]
    pub notes: Option<LegacyNotes>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFixedCost {
    pub id: String,
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    pub name: String,
    #[serde(default)]
    pub due_date: String,
    pub value: f64,
    #[serde(default)]
    pub is_paid: bool,
}

#[derive(Deserialize)]
pub struct LegacyNotes {
    #[serde(default)]
    pub folders: Vec<LegacyFolder>,
    #[serde(default)]
    pub notes: Vec<LegacyNote>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyNote {
    pub folder_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Default)]
pub struct ImportSummary {
    pub fixed_costs: usize,
    pub folders: usize,
    pub notes: usize,
    pub notes_skipped: bool,
}

/// Merges a legacy export into the user's account. Fixed costs follow
/// the old client's migration rules: a missing `baseId` falls back to
/// the legacy row id, a missing `month` to the current month. Notes
/// only migrate into an empty account; legacy folder ids are remapped
/// to the freshly created rows, and notes pointing at an unknown
/// folder are dropped.
pub fn import_legacy(
    conn: &Connection,
    user_id: i64,
    raw: &str,
) -> Result<ImportSummary, AppError> {
    let data: LegacyExport = serde_json::from_str(raw)?;
    let mut summary = ImportSummary::default();
    let month_now = current_month();

    for cost in &data.fixed_costs {
        let base_id = cost.base_id.clone().unwrap_or_else(|| cost.id.clone());
        let month = cost.month.clone().unwrap_or_else(|| month_now.clone());
        let amount_cents = (cost.value * 100.0).round() as i64;
        db::insert_fixed_cost(
            conn,
            user_id,
            &base_id,
            &month,
            &cost.name,
            &cost.due_date,
            amount_cents,
            cost.is_paid,
        )?;
        summary.fixed_costs += 1;
    }

    if let Some(legacy) = &data.notes {
        let account_empty = db::note_folder_count(conn, user_id)? == 0
            && db::note_count(conn, user_id)? == 0;
        if account_empty {
            let now = Local::now().to_rfc3339();
            let mut folder_ids: HashMap<&str, i64> = HashMap::new();
            for folder in &legacy.folders {
                let created_at = folder.created_at.clone().unwrap_or_else(|| now.clone());
                let id = db::insert_note_folder(conn, user_id, &folder.name, &created_at)?;
                folder_ids.insert(folder.id.as_str(), id);
                summary.folders += 1;
            }
            for note in &legacy.notes {
                let Some(folder_id) = folder_ids.get(note.folder_id.as_str()) else {
                    continue;
                };
                let updated_at = note.updated_at.clone().unwrap_or_else(|| now.clone());
                db::insert_note(conn, user_id, *folder_id, &note.title, &note.content, &updated_at)?;
                summary.notes += 1;
            }
        } else if !legacy.folders.is_empty() || !legacy.notes.is_empty() {
            summary.notes_skipped = true;
        }
    }

    Ok(summary)
}

#[derive(Serialize)]
pub struct ExportData {
    pub transactions: Vec<TransactionRecord>,
    pub categories: Vec<Category>,
    pub fixed_costs: Vec<FixedCostRecord>,
    pub note_folders: Vec<NoteFolder>,
    pub notes: Vec<NoteRecord>,
}

pub fn export_account(conn: &Connection, user_id: i64) -> Result<ExportData, AppError> {
    Ok(ExportData {
        transactions: db::list_all_transactions(conn, user_id)?,
        categories: db::list_categories(conn, user_id)?,
        fixed_costs: db::list_all_fixed_costs(conn, user_id)?,
        note_folders: db::list_note_folders(conn, user_id)?,
        notes: db::list_all_notes(conn, user_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        db::run_migrations(&conn).expect("migrations");
        conn
    }

    fn test_user(conn: &Connection) -> i64 {
        db::insert_user(conn, "ana@example.com", "hash", "2026-01-01T00:00:00Z").expect("user")
    }

    #[test]
    fn legacy_fixed_costs_get_defaults() {
        let conn = test_conn();
        let user = test_user(&conn);
        let raw = r#"{
            "fixed_costs": [
                {"id": "abc123", "name": "Aluguel", "dueDate": "2026-05-05", "value": 1500.0, "isPaid": true, "month": "2026-05", "baseId": "base-9"},
                {"id": "def456", "name": "Internet", "value": 99.9}
            ]
        }"#;

        let summary = import_legacy(&conn, user, raw).expect("import");
        assert_eq!(summary.fixed_costs, 2);

        let all = db::list_all_fixed_costs(&conn, user).unwrap();
        let rent = all.iter().find(|c| c.name == "Aluguel").unwrap();
        assert_eq!(rent.base_id, "base-9");
        assert_eq!(rent.month, "2026-05");
        assert_eq!(rent.amount_cents, 150000);
        assert!(rent.is_paid);

        let net = all.iter().find(|c| c.name == "Internet").unwrap();
        assert_eq!(net.base_id, "def456");
        assert_eq!(net.month, crate::current_month());
        assert_eq!(net.amount_cents, 9990);
        assert!(!net.is_paid);
    }

    #[test]
    fn legacy_notes_remap_folder_ids() {
        let conn = test_conn();
        let user = test_user(&conn);
        let raw = r#"{
            "notes": {
                "folders": [{"id": "f1", "name": "Ideias", "createdAt": "2026-02-01T10:00:00Z"}],
                "notes": [
                    {"folderId": "f1", "title": "Plano", "content": "texto", "updatedAt": "2026-02-02T10:00:00Z"},
                    {"folderId": "orphan", "title": "Perdida"}
                ]
            }
        }"#;

        let summary = import_legacy(&conn, user, raw).expect("import");
        assert_eq!(summary.folders, 1);
        assert_eq!(summary.notes, 1);
        assert!(!summary.notes_skipped);

        let folders = db::list_note_folders(&conn, user).unwrap();
        assert_eq!(folders.len(), 1);
        let notes = db::list_notes_in_folder(&conn, user, folders[0].id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Plano");
    }

    #[test]
    fn notes_are_skipped_when_account_has_data() {
        let conn = test_conn();
        let user = test_user(&conn);
        let existing = db::insert_note_folder(&conn, user, "Existente", "2026-01-01T00:00:00Z")
            .expect("folder");
        let raw = r#"{
            "notes": {
                "folders": [{"id": "f1", "name": "Ideias"}],
                "notes": []
            }
        }"#;

        let summary = import_legacy(&conn, user, raw).expect("import");
        assert!(summary.notes_skipped);
        assert_eq!(summary.folders, 0);

        let folders = db::list_note_folders(&conn, user).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, existing);
    }

    #[test]
    fn invalid_payload_is_an_error() {
        let conn = test_conn();
        let user = test_user(&conn);
        assert!(import_legacy(&conn, user, "not json").is_err());
    }

    #[test]
    fn export_collects_every_table() {
        let conn = test_conn();
        let user = test_user(&conn);
        db::insert_transaction(&conn, user, "2026-08-01", "Mercado", "Alimentação", "expense", 100)
            .unwrap();
        db::insert_category(&conn, user, "Alimentação").unwrap();
        db::insert_fixed_cost(&conn, user, "b1", "2026-08", "Aluguel", "", 150000, false).unwrap();
        let folder = db::insert_note_folder(&conn, user, "Ideias", "2026-08-01T00:00:00Z").unwrap();
        db::insert_note(&conn, user, folder, "Nota", "", "2026-08-01T00:00:00Z").unwrap();

        let export = export_account(&conn, user).expect("export");
        assert_eq!(export.transactions.len(), 1);
        assert_eq!(export.categories.len(), 1);
        assert_eq!(export.fixed_costs.len(), 1);
        assert_eq!(export.note_folders.len(), 1);
        assert_eq!(export.notes.len(), 1);
    }
}
