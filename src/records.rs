use chrono::{Local, Months, NaiveDate};
use rocket::form::Form;
use rocket::http::{CookieJar, Status};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Serialize;

use crate::db::{self, DbPool};
use crate::models::TransactionRecord;
use crate::{auth, format_date_br, format_money, parse_amount_to_cents, today_ymd};

const PAGE_SIZE: usize = 10;

#[derive(FromForm)]
pub struct RecordForm {
    description: String,
    amount: String,
    kind: String,
    category: String,
    occurred_on: String,
}

#[derive(FromForm)]
pub struct CategoryForm {
    name: String,
}

#[derive(Serialize)]
struct RecordView {
    id: i64,
    date: String,
    occurred_on: String,
    description: String,
    category: String,
    kind: String,
    amount: String,
    amount_raw: String,
}

fn record_view(record: &TransactionRecord) -> RecordView {
    RecordView {
        id: record.id,
        date: format_date_br(&record.occurred_on),
        occurred_on: record.occurred_on.clone(),
        description: record.description.clone(),
        category: record.category.clone(),
        kind: record.kind.clone(),
        amount: format_money(record.amount_cents),
        amount_raw: format_money(record.amount_cents),
    }
}

/// Search matches description or category, case-insensitively; empty
/// filters match everything.
fn filter_records(
    records: Vec<TransactionRecord>,
    search: &str,
    category: &str,
    kind: &str,
) -> Vec<TransactionRecord> {
    let needle = search.trim().to_lowercase();
    records
        .into_iter()
        .filter(|t| {
            let matches_search = needle.is_empty()
                || t.description.to_lowercase().contains(&needle)
                || t.category.to_lowercase().contains(&needle);
            let matches_category = category.is_empty() || t.category == category;
            let matches_kind = kind.is_empty() || t.kind == kind;
            matches_search && matches_category && matches_kind
        })
        .collect()
}

fn page_slice<T>(items: &[T], page: usize) -> (usize, usize, &[T]) {
    let page_count = items.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, page_count);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    (page, page_count, &items[start..end])
}

fn parse_range(start: Option<&str>, end: Option<&str>) -> (String, String) {
    let today = Local::now().date_naive();
    let end = end
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or(today);
    let start = start
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| today.checked_sub_months(Months::new(1)).unwrap_or(today));
    (
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}

#[get("/records?<search>&<category>&<kind>&<start>&<end>&<page>&<edit>")]
#[allow(clippy::too_many_arguments)]
pub fn records(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    search: Option<String>,
    category: Option<String>,
    kind: Option<String>,
    start: Option<String>,
    end: Option<String>,
    page: Option<usize>,
    edit: Option<i64>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;

    let search = search.unwrap_or_default();
    let category = category.unwrap_or_default();
    let kind = kind.unwrap_or_default();
    let (start_str, end_str) = parse_range(start.as_deref(), end.as_deref());

    let fetched =
        db::list_transactions_between(&conn, user.id, &start_str, &end_str).unwrap_or_default();
    let filtered = filter_records(fetched, &search, &category, &kind);
    let (page, page_count, slice) = page_slice(&filtered, page.unwrap_or(1));

    let total = filtered.len();
    let views: Vec<RecordView> = slice.iter().map(record_view).collect();

    let editing = edit
        .and_then(|id| db::transaction_by_id(&conn, user.id, id).ok().flatten())
        .map(|t| record_view(&t));
    let categories = db::ensure_categories(&conn, user.id).unwrap_or_default();

    let context = serde_json::json!({
        "active": "records",
        "username": auth::display_name(&user),
        "search": search,
        "category": category,
        "kind": kind,
        "start": start_str,
        "end": end_str,
        "today": today_ymd(),
        "records": views,
        "total": total,
        "page": page,
        "page_count": page_count,
        "categories": categories,
        "editing": editing,
    });
    Ok(Template::render("records", &context))
}

fn validated_fields(form: RecordForm) -> Result<(String, String, String, String, i64), Status> {
    let description = form.description.trim().to_string();
    if description.is_empty() {
        return Err(Status::BadRequest);
    }
    if form.kind != "income" && form.kind != "expense" {
        return Err(Status::BadRequest);
    }
    let amount_cents = parse_amount_to_cents(&form.amount).ok_or(Status::BadRequest)?;
    let occurred_on = if form.occurred_on.trim().is_empty() {
        today_ymd()
    } else {
        form.occurred_on.trim().to_string()
    };
    Ok((description, form.category, form.kind, occurred_on, amount_cents))
}

#[post("/records", data = "<form>")]
pub fn create_record(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<RecordForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let (description, category, kind, occurred_on, amount_cents) =
        validated_fields(form.into_inner())?;

    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::insert_transaction(
        &conn,
        user.id,
        &occurred_on,
        &description,
        &category,
        &kind,
        amount_cents,
    )
    .map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to("/records"))
}

#[post("/records/<id>", data = "<form>")]
pub fn update_record(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<RecordForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let (description, category, kind, occurred_on, amount_cents) =
        validated_fields(form.into_inner())?;

    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::update_transaction(
        &conn,
        user.id,
        id,
        &occurred_on,
        &description,
        &category,
        &kind,
        amount_cents,
    )
    .map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to("/records"))
}

#[post("/records/<id>/delete")]
pub fn delete_record(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::delete_transaction(&conn, user.id, id).map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to("/records"))
}

#[post("/categories", data = "<form>")]
pub fn add_category(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<CategoryForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let name = form.into_inner().name.trim().to_string();
    if name.is_empty() {
        return Err(Status::BadRequest);
    }
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::insert_category(&conn, user.id, &name).map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to("/records"))
}

#[post("/categories/delete", data = "<form>")]
pub fn remove_category(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<CategoryForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    // The last remaining category stays; transactions keep their
    // category string either way.
    let count = db::category_count(&conn, user.id).unwrap_or(0);
    if count > 1 {
        db::delete_category(&conn, user.id, form.name.trim())
            .map_err(|_| Status::InternalServerError)?;
    }
    Ok(Redirect::to("/records"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(desc: &str, category: &str, kind: &str) -> TransactionRecord {
        TransactionRecord {
            id: 0,
            occurred_on: "2026-08-01".to_string(),
            description: desc.to_string(),
            category: category.to_string(),
            kind: kind.to_string(),
            amount_cents: 100,
        }
    }

    #[test]
    fn search_matches_description_and_category() {
        let records = vec![
            record("Mercado do mês", "Alimentação", "expense"),
            record("Uber", "Transporte", "expense"),
            record("Salário", "Trabalho", "income"),
        ];
        let hits = filter_records(records, "transporte", "", "");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "Uber");
    }

    #[test]
    fn category_and_kind_filters_compose() {
        let records = vec![
            record("Mercado", "Alimentação", "expense"),
            record("Restaurante", "Alimentação", "expense"),
            record("Vale refeição", "Alimentação", "income"),
            record("Uber", "Transporte", "expense"),
        ];
        let hits = filter_records(records, "", "Alimentação", "expense");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_filters_keep_everything() {
        let records = vec![record("a", "X", "income"), record("b", "Y", "expense")];
        assert_eq!(filter_records(records, "", "", "").len(), 2);
    }

    #[test]
    fn pagination_clamps_page_into_range() {
        let items: Vec<i32> = (0..25).collect();
        let (page, page_count, slice) = page_slice(&items, 1);
        assert_eq!((page, page_count, slice.len()), (1, 3, 10));

        let (page, _, slice) = page_slice(&items, 3);
        assert_eq!((page, slice.len()), (3, 5));

        let (page, _, slice) = page_slice(&items, 99);
        assert_eq!((page, slice.len()), (3, 5));

        let (page, page_count, slice) = page_slice::<i32>(&[], 7);
        assert_eq!((page, page_count, slice.len()), (1, 1, 0));
    }
}
