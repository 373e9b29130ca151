use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate};
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Serialize;

use crate::db::{self, DbPool};
use crate::models::TransactionRecord;
use crate::{auth, format_money};

const MAX_SERIES_DAYS: i64 = 730;
const MAX_SERIES_POINTS: i64 = 366;

#[derive(Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub date: String,
    pub amount_cents: i64,
}

#[derive(Clone, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub amount_cents: i64,
}

pub struct Stats {
    pub income_cents: i64,
    pub expense_cents: i64,
    pub avg_expense_cents: i64,
    pub top_category: Option<CategoryTotal>,
}

/// Expense totals per category, highest first. Category names are
/// trimmed before grouping so "Moradia " and "Moradia" land together.
fn expense_by_category(records: &[TransactionRecord]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for record in records {
        if record.kind != "expense" {
            continue;
        }
        let name = record.category.trim();
        match totals.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.amount_cents += record.amount_cents,
            None => totals.push(CategoryTotal {
                name: name.to_string(),
                amount_cents: record.amount_cents,
            }),
        }
    }
    totals.retain(|c| c.amount_cents > 0);
    totals.sort_by(|a, b| b.amount_cents.cmp(&a.amount_cents));
    totals
}

fn compute_stats(records: &[TransactionRecord]) -> Stats {
    let income_cents = records
        .iter()
        .filter(|t| t.kind == "income")
        .map(|t| t.amount_cents)
        .sum();
    let expense_cents: i64 = records
        .iter()
        .filter(|t| t.kind == "expense")
        .map(|t| t.amount_cents)
        .sum();
    // Average over every filtered record, income included.
    let avg_expense_cents = expense_cents / records.len().max(1) as i64;
    let top_category = expense_by_category(records).into_iter().next();

    Stats {
        income_cents,
        expense_cents,
        avg_expense_cents,
        top_category,
    }
}

/// One point per day from `start` to `end`, zero-filled. The range is
/// capped at 730 days, and ranges wider than 366 points are sampled
/// with a uniform day step to keep the chart payload bounded.
fn daily_expense_series(
    records: &[TransactionRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<SeriesPoint> {
    if end < start {
        return Vec::new();
    }

    let mut by_day: HashMap<&str, i64> = HashMap::new();
    for record in records {
        if record.kind == "expense" {
            *by_day.entry(record.occurred_on.as_str()).or_insert(0) += record.amount_cents;
        }
    }

    let days = ((end - start).num_days() + 1).min(MAX_SERIES_DAYS);
    let step = if days > MAX_SERIES_POINTS {
        (days as u64).div_ceil(MAX_SERIES_POINTS as u64) as i64
    } else {
        1
    };

    let mut out = Vec::new();
    let mut offset = 0;
    while offset < days {
        let day = start + Duration::days(offset);
        let date = day.format("%Y-%m-%d").to_string();
        out.push(SeriesPoint {
            label: day.format("%d/%m").to_string(),
            amount_cents: by_day.get(date.as_str()).copied().unwrap_or(0),
            date,
        });
        offset += step;
    }
    out
}

fn parse_range(start: Option<&str>, end: Option<&str>) -> (NaiveDate, NaiveDate) {
    let today = Local::now().date_naive();
    let end = end
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or(today);
    let start = start
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| today - Duration::days(7));
    (start, end)
}

#[get("/?<start>&<end>&<category>")]
pub fn dashboard(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    start: Option<String>,
    end: Option<String>,
    category: Option<String>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;

    let (start_date, end_date) = parse_range(start.as_deref(), end.as_deref());
    let start_str = start_date.format("%Y-%m-%d").to_string();
    let end_str = end_date.format("%Y-%m-%d").to_string();

    let mut records =
        db::list_transactions_between(&conn, user.id, &start_str, &end_str).unwrap_or_default();
    let category = category.unwrap_or_default();
    if !category.is_empty() && category != "all" {
        records.retain(|t| t.category == category);
    }

    let stats = compute_stats(&records);
    let series = daily_expense_series(&records, start_date, end_date);
    let by_category = expense_by_category(&records);
    let categories = db::ensure_categories(&conn, user.id).unwrap_or_default();

    let context = serde_json::json!({
        "active": "dashboard",
        "username": auth::display_name(&user),
        "start": start_str,
        "end": end_str,
        "category": category,
        "categories": categories,
        "income": format_money(stats.income_cents),
        "expense": format_money(stats.expense_cents),
        "daily_avg": format_money(stats.avg_expense_cents),
        "top_category": stats.top_category.as_ref().map(|c| c.name.clone()),
        "top_category_total": stats.top_category.as_ref().map(|c| format_money(c.amount_cents)),
        "series_json": serde_json::to_string(&series).unwrap_or_else(|_| "[]".to_string()),
        "by_category_json": serde_json::to_string(&by_category).unwrap_or_else(|_| "[]".to_string()),
    });
    Ok(Template::render("dashboard", &context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, category: &str, kind: &str, cents: i64) -> TransactionRecord {
        TransactionRecord {
            id: 0,
            occurred_on: date.to_string(),
            description: String::new(),
            category: category.to_string(),
            kind: kind.to_string(),
            amount_cents: cents,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn stats_sum_by_kind() {
        let records = vec![
            record("2026-08-01", "Trabalho", "income", 500000),
            record("2026-08-02", "Moradia", "expense", 150000),
            record("2026-08-03", "Alimentação", "expense", 30000),
            record("2026-08-03", "Moradia", "expense", 10000),
        ];
        let stats = compute_stats(&records);
        assert_eq!(stats.income_cents, 500000);
        assert_eq!(stats.expense_cents, 190000);
        // Divides by the record count, income rows included.
        assert_eq!(stats.avg_expense_cents, 190000 / 4);
        let top = stats.top_category.expect("top category");
        assert_eq!(top.name, "Moradia");
        assert_eq!(top.amount_cents, 160000);
    }

    #[test]
    fn stats_on_empty_input_are_zero() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.income_cents, 0);
        assert_eq!(stats.expense_cents, 0);
        assert_eq!(stats.avg_expense_cents, 0);
        assert!(stats.top_category.is_none());
    }

    #[test]
    fn category_totals_trim_and_merge_names() {
        let records = vec![
            record("2026-08-01", "Moradia ", "expense", 100),
            record("2026-08-02", "Moradia", "expense", 50),
            record("2026-08-02", "Lazer", "expense", 500),
            record("2026-08-02", "Trabalho", "income", 9999),
        ];
        let totals = expense_by_category(&records);
        let view: Vec<(&str, i64)> = totals
            .iter()
            .map(|c| (c.name.as_str(), c.amount_cents))
            .collect();
        assert_eq!(view, vec![("Lazer", 500), ("Moradia", 150)]);
    }

    #[test]
    fn series_zero_fills_missing_days() {
        let records = vec![
            record("2026-08-02", "Lazer", "expense", 700),
            record("2026-08-02", "Outro", "expense", 300),
            record("2026-08-03", "Trabalho", "income", 100000),
        ];
        let series = daily_expense_series(&records, date("2026-08-01"), date("2026-08-04"));
        let values: Vec<i64> = series.iter().map(|p| p.amount_cents).collect();
        assert_eq!(values, vec![0, 1000, 0, 0]);
        assert_eq!(series[1].label, "02/08");
        assert_eq!(series[1].date, "2026-08-02");
    }

    #[test]
    fn series_is_empty_for_inverted_range() {
        let series = daily_expense_series(&[], date("2026-08-04"), date("2026-08-01"));
        assert!(series.is_empty());
    }

    #[test]
    fn series_caps_and_samples_wide_ranges() {
        let series = daily_expense_series(&[], date("2020-01-01"), date("2026-01-01"));
        // Capped at 730 days, sampled every other day.
        assert_eq!(series.len(), 365);
        assert_eq!(series[0].date, "2020-01-01");
        assert_eq!(series[1].date, "2020-01-03");
    }

    #[test]
    fn range_defaults_to_last_seven_days() {
        let (start, end) = parse_range(None, None);
        assert_eq!(end - start, Duration::days(7));
        let (start, _) = parse_range(Some("2026-08-01"), Some("garbage"));
        assert_eq!(start, date("2026-08-01"));
    }
}
