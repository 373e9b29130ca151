#[macro_use]
extern crate rocket;

mod auth;
mod dashboard;
mod db;
mod error;
mod fixed_costs;
mod migrate;
mod models;
mod notes;
mod records;
mod settings;

use std::path::PathBuf;

use chrono::Local;
use db::DbPool;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    let whole = abs / 100;
    let frac = abs % 100;
    format!("{sign}{whole}.{frac:02}")
}

pub fn parse_amount_to_cents(input: &str) -> Option<i64> {
    let mut s = input.trim().to_string();
    if s.is_empty() {
        return None;
    }
    if s.starts_with('-') {
        return None;
    }
    s = s.replace(',', ".");
    let mut parts = s.split('.');
    let whole_str = parts.next()?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return None;
    }
    let whole: i64 = whole_str.parse().ok()?;
    let frac = match frac_str {
        None => 0,
        Some(frac) => {
            if frac.len() > 2 {
                return None;
            }
            let mut padded = frac.to_string();
            while padded.len() < 2 {
                padded.push('0');
            }
            padded.parse::<i64>().ok()?
        }
    };
    Some(whole * 100 + frac)
}

pub fn today_ymd() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn current_month() -> String {
    Local::now().date_naive().format("%Y-%m").to_string()
}

/// `YYYY-MM-DD` → `DD/MM/YYYY` for display; anything else passes through.
pub fn format_date_br(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 3 {
        format!("{}/{}/{}", parts[2], parts[1], parts[0])
    } else {
        date.to_string()
    }
}

fn build_rocket(pool: DbPool) -> Rocket<Build> {
    rocket::build()
        .manage(pool)
        .mount(
            "/",
            routes![
                auth::login,
                auth::login_post,
                auth::register,
                auth::register_post,
                auth::logout,
                dashboard::dashboard,
                records::records,
                records::create_record,
                records::update_record,
                records::delete_record,
                records::add_category,
                records::remove_category,
                fixed_costs::fixed_costs,
                fixed_costs::create_fixed_cost,
                fixed_costs::generate_next_month,
                fixed_costs::toggle_paid,
                fixed_costs::edit_fixed_cost,
                fixed_costs::delete_cost,
                notes::notes,
                notes::create_folder,
                notes::rename_folder,
                notes::delete_folder,
                notes::create_note,
                notes::save_note,
                notes::delete_note,
                notes::download_note,
                settings::settings,
                settings::update_profile,
                settings::change_password,
                settings::logout_all,
                settings::import_legacy,
                settings::export_account
            ],
        )
        .mount("/static", FileServer::from("static"))
        .attach(Template::fairing())
}

#[launch]
fn rocket() -> _ {
    let mut db_path = PathBuf::from("data");
    std::fs::create_dir_all(&db_path).expect("create data directory");
    db_path.push("organafin.sqlite");
    let pool = db::init_db(&db_path);
    build_rocket(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;
    use uuid::Uuid;

    fn client() -> Client {
        let dir = std::env::temp_dir().join(format!("organafin-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let pool = db::init_db(&dir.join("test.sqlite"));
        Client::tracked(build_rocket(pool)).expect("rocket client")
    }

    #[test]
    fn parse_amount_accepts_comma_and_dot() {
        assert_eq!(parse_amount_to_cents("12,50"), Some(1250));
        assert_eq!(parse_amount_to_cents("12.5"), Some(1250));
        assert_eq!(parse_amount_to_cents(" 7 "), Some(700));
        assert_eq!(parse_amount_to_cents("0,03"), Some(3));
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount_to_cents(""), None);
        assert_eq!(parse_amount_to_cents("-5"), None);
        assert_eq!(parse_amount_to_cents("1.2.3"), None);
        assert_eq!(parse_amount_to_cents("1,234"), None);
        assert_eq!(parse_amount_to_cents("abc"), None);
    }

    #[test]
    fn money_formatting_pads_cents() {
        assert_eq!(format_money(1250), "12.50");
        assert_eq!(format_money(3), "0.03");
        assert_eq!(format_money(-705), "-7.05");
    }

    #[test]
    fn date_display_is_brazilian() {
        assert_eq!(format_date_br("2026-08-07"), "07/08/2026");
        assert_eq!(format_date_br(""), "");
    }

    #[test]
    fn unauthenticated_views_redirect_to_login() {
        let client = client();
        for path in ["/", "/records", "/fixed-costs", "/notes", "/settings"] {
            let resp = client.get(path).dispatch();
            assert_eq!(resp.status(), Status::SeeOther, "path {path}");
            assert_eq!(resp.headers().get_one("Location"), Some("/login"));
        }
    }

    #[test]
    fn register_login_and_browse() {
        let client = client();

        let resp = client
            .post("/register")
            .header(ContentType::Form)
            .body("email=ana%40example.com&password=segredo1&confirm_password=segredo1")
            .dispatch();
        assert_eq!(resp.status(), Status::SeeOther);

        // The tracked client keeps the session cookie.
        for path in ["/", "/records", "/fixed-costs", "/notes", "/settings"] {
            let resp = client.get(path).dispatch();
            assert_eq!(resp.status(), Status::Ok, "path {path}");
        }

        let resp = client.get("/logout").dispatch();
        assert_eq!(resp.status(), Status::SeeOther);
        let resp = client.get("/").dispatch();
        assert_eq!(resp.status(), Status::SeeOther);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let client = client();
        let body = "email=ana%40example.com&password=segredo1&confirm_password=segredo1";
        let resp = client
            .post("/register")
            .header(ContentType::Form)
            .body(body)
            .dispatch();
        assert_eq!(resp.status(), Status::SeeOther);

        client.get("/logout").dispatch();
        let resp = client
            .post("/register")
            .header(ContentType::Form)
            .body(body)
            .dispatch();
        assert_eq!(resp.status(), Status::Ok);
        let page = resp.into_string().expect("body");
        assert!(page.contains("Este e-mail já está cadastrado."));
    }
}
