use chrono::{Months, NaiveDate};
use rocket::form::Form;
use rocket::http::{CookieJar, Status};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::models::FixedCostRecord;
use crate::{auth, current_month, format_date_br, format_money, parse_amount_to_cents};

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

#[derive(FromForm)]
pub struct NewCostForm {
    name: String,
    due_on: String,
    amount: String,
    month: String,
}

#[derive(FromForm)]
pub struct EditCostForm {
    name: String,
    due_on: String,
    amount: String,
    month: String,
}

#[derive(FromForm)]
pub struct MonthForm {
    month: String,
}

#[derive(FromForm)]
pub struct DeleteCostForm {
    scope: String,
    month: String,
}

#[derive(Serialize)]
struct FixedCostView {
    id: i64,
    name: String,
    due: String,
    due_on: String,
    amount: String,
    is_paid: bool,
}

#[derive(Serialize)]
struct MonthOption {
    value: String,
    label: String,
}

fn parse_month(month: &str) -> Option<(i32, u32)> {
    let (y, m) = month.split_once('-')?;
    let year: i32 = y.parse().ok()?;
    let mon: u32 = m.parse().ok()?;
    if !(1..=12).contains(&mon) {
        return None;
    }
    Some((year, mon))
}

fn next_month(month: &str) -> Option<String> {
    let (year, mon) = parse_month(month)?;
    let date = NaiveDate::from_ymd_opt(year, mon, 1)?;
    let next = date.checked_add_months(Months::new(1))?;
    Some(next.format("%Y-%m").to_string())
}

fn month_diff(from: &str, to: &str) -> Option<i32> {
    let (fy, fm) = parse_month(from)?;
    let (ty, tm) = parse_month(to)?;
    Some((ty - fy) * 12 + (tm as i32 - fm as i32))
}

/// Shifts a `YYYY-MM-DD` date forward by whole months; the day is
/// clamped to the target month's length. Blank or unparsable dates
/// pass through untouched.
fn shift_date_by_months(date: &str, months: i32) -> String {
    if date.is_empty() || months <= 0 {
        return date.to_string();
    }
    let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
        return date.to_string();
    };
    match parsed.checked_add_months(Months::new(months as u32)) {
        Some(shifted) => shifted.format("%Y-%m-%d").to_string(),
        None => date.to_string(),
    }
}

fn month_label(month: &str) -> String {
    match parse_month(month) {
        Some((year, mon)) => format!("{} {}", MONTH_NAMES[(mon - 1) as usize], year),
        None => month.to_string(),
    }
}

/// Months a newly added cost is replicated into: the selected month and
/// every already-generated month after it, paired with the distance in
/// months used to shift the due date.
fn replication_targets(months: &[String], selected: &str) -> Vec<(String, i32)> {
    months
        .iter()
        .filter(|m| m.as_str() >= selected)
        .filter_map(|m| month_diff(selected, m).map(|diff| (m.clone(), diff)))
        .collect()
}

fn cost_view(cost: &FixedCostRecord) -> FixedCostView {
    FixedCostView {
        id: cost.id,
        name: cost.name.clone(),
        due: if cost.due_on.is_empty() {
            "-".to_string()
        } else {
            format_date_br(&cost.due_on)
        },
        due_on: cost.due_on.clone(),
        amount: format_money(cost.amount_cents),
        is_paid: cost.is_paid,
    }
}

fn month_redirect(month: &str) -> Redirect {
    Redirect::to(format!("/fixed-costs?month={month}"))
}

#[get("/fixed-costs?<month>")]
pub fn fixed_costs(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;

    let mut months = db::list_fixed_cost_months(&conn, user.id).unwrap_or_default();
    if months.is_empty() {
        months.push(current_month());
    }
    let selected = month
        .filter(|m| parse_month(m).is_some())
        .unwrap_or_else(|| months.last().cloned().unwrap_or_else(current_month));

    let costs = db::list_fixed_costs(&conn, user.id, &selected).unwrap_or_default();
    let total = db::month_fixed_cost_total(&conn, user.id, &selected).unwrap_or(0);
    let views: Vec<FixedCostView> = costs.iter().map(cost_view).collect();
    let month_options: Vec<MonthOption> = months
        .iter()
        .map(|m| MonthOption {
            value: m.clone(),
            label: month_label(m),
        })
        .collect();

    let context = serde_json::json!({
        "active": "fixed-costs",
        "username": auth::display_name(&user),
        "months": month_options,
        "selected": selected,
        "selected_label": month_label(&selected),
        "costs": views,
        "total": format_money(total),
    });
    Ok(Template::render("fixed_costs", &context))
}

#[post("/fixed-costs", data = "<form>")]
pub fn create_fixed_cost(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<NewCostForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let name = form.name.trim();
    if name.is_empty() || parse_month(&form.month).is_none() {
        return Err(Status::BadRequest);
    }
    let amount_cents = parse_amount_to_cents(&form.amount).ok_or(Status::BadRequest)?;
    let due_on = form.due_on.trim();

    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let months = db::list_fixed_cost_months(&conn, user.id)
        .map_err(|_| Status::InternalServerError)?;
    let base_id = Uuid::new_v4().to_string();

    let targets = replication_targets(&months, &form.month);
    if targets.is_empty() {
        db::insert_fixed_cost(
            &conn, user.id, &base_id, &form.month, name, due_on, amount_cents, false,
        )
        .map_err(|_| Status::InternalServerError)?;
    } else {
        for (month, diff) in targets {
            let due = shift_date_by_months(due_on, diff);
            db::insert_fixed_cost(
                &conn, user.id, &base_id, &month, name, &due, amount_cents, false,
            )
            .map_err(|_| Status::InternalServerError)?;
        }
    }
    Ok(month_redirect(&form.month))
}

#[post("/fixed-costs/next", data = "<form>")]
pub fn generate_next_month(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<MonthForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let next = next_month(&form.month).ok_or(Status::BadRequest)?;

    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let months = db::list_fixed_cost_months(&conn, user.id)
        .map_err(|_| Status::InternalServerError)?;
    if months.contains(&next) {
        return Ok(month_redirect(&next));
    }

    let costs =
        db::list_fixed_costs(&conn, user.id, &form.month).map_err(|_| Status::InternalServerError)?;
    for cost in costs {
        let base_id = if cost.base_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            cost.base_id.clone()
        };
        let due = shift_date_by_months(&cost.due_on, 1);
        db::insert_fixed_cost(
            &conn,
            user.id,
            &base_id,
            &next,
            &cost.name,
            &due,
            cost.amount_cents,
            false,
        )
        .map_err(|_| Status::InternalServerError)?;
    }
    Ok(month_redirect(&next))
}

#[post("/fixed-costs/<id>/toggle", data = "<form>")]
pub fn toggle_paid(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<MonthForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::toggle_fixed_cost_paid(&conn, user.id, id).map_err(|_| Status::InternalServerError)?;
    Ok(month_redirect(&form.month))
}

#[post("/fixed-costs/<id>", data = "<form>")]
pub fn edit_fixed_cost(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<EditCostForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let name = form.name.trim();
    if name.is_empty() {
        return Err(Status::BadRequest);
    }
    let amount_cents = parse_amount_to_cents(&form.amount).ok_or(Status::BadRequest)?;

    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::update_fixed_cost(&conn, user.id, id, name, form.due_on.trim(), amount_cents)
        .map_err(|_| Status::InternalServerError)?;
    Ok(month_redirect(&form.month))
}

#[post("/fixed-costs/<id>/delete", data = "<form>")]
pub fn delete_cost(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<DeleteCostForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let form = form.into_inner();

    if form.scope == "future" {
        if let Ok(Some(cost)) = db::fixed_cost_by_id(&conn, user.id, id) {
            db::delete_fixed_costs_forward(&conn, user.id, &cost.base_id, &form.month)
                .map_err(|_| Status::InternalServerError)?;
        }
    } else {
        db::delete_fixed_cost(&conn, user.id, id).map_err(|_| Status::InternalServerError)?;
    }
    Ok(month_redirect(&form.month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_month_rolls_over_december() {
        assert_eq!(next_month("2026-08").as_deref(), Some("2026-09"));
        assert_eq!(next_month("2026-12").as_deref(), Some("2027-01"));
        assert_eq!(next_month("garbage"), None);
        assert_eq!(next_month("2026-13"), None);
    }

    #[test]
    fn month_diff_spans_years() {
        assert_eq!(month_diff("2026-08", "2026-08"), Some(0));
        assert_eq!(month_diff("2026-08", "2026-11"), Some(3));
        assert_eq!(month_diff("2026-11", "2027-02"), Some(3));
    }

    #[test]
    fn shifted_due_dates_clamp_the_day() {
        assert_eq!(shift_date_by_months("2026-01-31", 1), "2026-02-28");
        assert_eq!(shift_date_by_months("2024-01-31", 1), "2024-02-29");
        assert_eq!(shift_date_by_months("2026-08-10", 2), "2026-10-10");
        assert_eq!(shift_date_by_months("", 3), "");
        assert_eq!(shift_date_by_months("2026-08-10", 0), "2026-08-10");
    }

    #[test]
    fn replication_covers_selected_and_later_months() {
        let months = vec![
            "2026-06".to_string(),
            "2026-07".to_string(),
            "2026-08".to_string(),
        ];
        let targets = replication_targets(&months, "2026-07");
        assert_eq!(
            targets,
            vec![("2026-07".to_string(), 0), ("2026-08".to_string(), 1)]
        );
        assert!(replication_targets(&[], "2026-07").is_empty());
    }

    #[test]
    fn month_labels_are_localized() {
        assert_eq!(month_label("2026-09"), "Setembro 2026");
        assert_eq!(month_label("bogus"), "bogus");
    }
}
