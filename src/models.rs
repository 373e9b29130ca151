use serde::Serialize;

#[derive(Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub occurred_on: String,
    pub description: String,
    pub category: String,
    pub kind: String,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct FixedCostRecord {
    pub id: i64,
    pub base_id: String,
    pub month: String,
    pub name: String,
    pub due_on: String,
    pub amount_cents: i64,
    pub is_paid: bool,
}

#[derive(Serialize)]
pub struct NoteFolder {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct NoteRecord {
    pub id: i64,
    pub folder_id: i64,
    pub title: String,
    pub content: String,
    pub updated_at: String,
}
