use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Local;
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::models::User;

const MAX_SESSIONS: i64 = 5;

#[derive(FromForm)]
pub struct LoginForm {
    email: String,
    password: String,
}

#[derive(FromForm)]
pub struct RegisterForm {
    email: String,
    password: String,
    confirm_password: String,
}

pub fn hash_password(password: &str) -> Result<String, rocket::http::Status> {
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes())
        .map_err(|_| rocket::http::Status::InternalServerError)?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn require_user(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<User, Redirect> {
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;
    if let Some(cookie) = cookies.get("session") {
        if let Ok(Some(user)) = db::user_by_session(&conn, cookie.value()) {
            return Ok(user);
        }
    }
    Err(Redirect::to("/login"))
}

pub fn current_user(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Option<User> {
    let conn = pool.get().ok()?;
    let token = cookies.get("session")?.value().to_string();
    db::user_by_session(&conn, &token).ok().flatten()
}

/// Name shown in the header: the profile display name when set, the
/// part of the email before the @ otherwise.
pub fn display_name(user: &User) -> String {
    match &user.display_name {
        Some(name) if !name.trim().is_empty() => name.clone(),
        _ => user
            .email
            .split('@')
            .next()
            .unwrap_or(&user.email)
            .to_string(),
    }
}

fn open_session(
    conn: &Connection,
    cookies: &CookieJar<'_>,
    user_id: i64,
) -> rusqlite::Result<()> {
    let token = Uuid::new_v4().to_string();
    let created_at = Local::now().to_rfc3339();
    db::create_session(conn, user_id, &token, &created_at)?;
    db::prune_sessions(conn, user_id, MAX_SESSIONS)?;

    let mut cookie = Cookie::new("session", token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
    Ok(())
}

fn render_login(error: Option<&str>) -> Template {
    Template::render(
        "login",
        serde_json::json!({
            "error": error,
        }),
    )
}

fn render_register(error: Option<&str>) -> Template {
    Template::render(
        "register",
        serde_json::json!({
            "error": error,
        }),
    )
}

#[get("/login")]
pub fn login(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Template, Redirect> {
    if current_user(pool, cookies).is_some() {
        return Err(Redirect::to("/"));
    }
    Ok(render_login(None))
}

#[post("/login", data = "<form>")]
pub fn login_post(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<LoginForm>,
) -> Result<Redirect, Template> {
    let conn = pool
        .get()
        .map_err(|_| render_login(Some("Erro de conexão com o banco")))?;
    let form = form.into_inner();
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(render_login(Some("Informe e-mail e senha")));
    }

    let creds = db::user_credentials(&conn, email)
        .map_err(|_| render_login(Some("Erro ao buscar usuário")))?;
    let Some((user_id, hash)) = creds else {
        return Err(render_login(Some("Email ou senha incorretos.")));
    };
    if !verify_password(&hash, &form.password) {
        return Err(render_login(Some("Email ou senha incorretos.")));
    }

    open_session(&conn, cookies, user_id)
        .map_err(|_| render_login(Some("Não foi possível criar a sessão")))?;
    Ok(Redirect::to("/"))
}

#[get("/register")]
pub fn register(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Template, Redirect> {
    if current_user(pool, cookies).is_some() {
        return Err(Redirect::to("/"));
    }
    Ok(render_register(None))
}

#[post("/register", data = "<form>")]
pub fn register_post(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<RegisterForm>,
) -> Result<Redirect, Template> {
    let conn = pool
        .get()
        .map_err(|_| render_register(Some("Erro de conexão com o banco")))?;
    let form = form.into_inner();
    let email = form.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(render_register(Some("Informe um e-mail válido")));
    }
    if form.password.len() < 6 {
        return Err(render_register(Some(
            "A senha deve ter pelo menos 6 caracteres.",
        )));
    }
    if form.password != form.confirm_password {
        return Err(render_register(Some("As senhas não coincidem")));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| render_register(Some("Não foi possível salvar a senha")))?;
    let created_at = Local::now().to_rfc3339();
    let user_id = db::insert_user(&conn, email, &password_hash, &created_at)
        .map_err(|_| render_register(Some("Este e-mail já está cadastrado.")))?;

    // First login seeds the default category set.
    db::ensure_categories(&conn, user_id)
        .map_err(|_| render_register(Some("Erro ao criar categorias iniciais")))?;

    open_session(&conn, cookies, user_id)
        .map_err(|_| render_register(Some("Não foi possível criar a sessão")))?;
    Ok(Redirect::to("/"))
}

#[get("/logout")]
pub fn logout(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Redirect {
    if let Some(cookie) = cookies.get("session") {
        if let Ok(conn) = pool.get() {
            let _ = db::delete_session(&conn, cookie.value());
        }
    }
    let mut cookie = Cookie::named("session");
    cookie.set_path("/");
    cookies.remove(cookie);
    Redirect::to("/login")
}
