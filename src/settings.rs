use rocket::form::Form;
use rocket::http::{CookieJar, Header, Status};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;

use crate::auth;
use crate::db::{self, DbPool};
use crate::migrate;
use crate::models::User;

#[derive(FromForm)]
pub struct ProfileForm {
    display_name: String,
}

#[derive(FromForm)]
pub struct ChangePasswordForm {
    current_password: String,
    new_password: String,
    confirm_password: String,
}

#[derive(FromForm)]
pub struct ImportForm {
    payload: String,
}

#[derive(Responder)]
#[response(content_type = "application/json")]
pub struct JsonDownload {
    body: String,
    disposition: Header<'static>,
}

fn render_settings(user: &User, sessions: i64, error: Option<&str>, notice: Option<&str>) -> Template {
    Template::render(
        "settings",
        serde_json::json!({
            "active": "settings",
            "username": auth::display_name(user),
            "email": user.email,
            "display_name": user.display_name,
            "active_sessions": sessions,
            "error": error,
            "notice": notice,
        }),
    )
}

#[get("/settings")]
pub fn settings(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;
    let sessions = db::session_count(&conn, user.id).unwrap_or(1);
    Ok(render_settings(&user, sessions, None, None))
}

#[post("/settings/profile", data = "<form>")]
pub fn update_profile(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<ProfileForm>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;
    let sessions = db::session_count(&conn, user.id).unwrap_or(1);

    let name = form.into_inner().display_name.trim().to_string();
    if name.is_empty() {
        return Ok(render_settings(
            &user,
            sessions,
            Some("Informe um nome de exibição"),
            None,
        ));
    }
    if db::update_display_name(&conn, user.id, &name).is_err() {
        return Ok(render_settings(
            &user,
            sessions,
            Some("Erro ao atualizar nome"),
            None,
        ));
    }

    let updated = User {
        id: user.id,
        email: user.email.clone(),
        display_name: Some(name),
    };
    Ok(render_settings(&updated, sessions, None, Some("Nome atualizado")))
}

#[post("/settings/password", data = "<form>")]
pub fn change_password(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<ChangePasswordForm>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;
    let sessions = db::session_count(&conn, user.id).unwrap_or(1);
    let form = form.into_inner();

    if form.new_password.len() < 6 {
        return Ok(render_settings(
            &user,
            sessions,
            Some("A senha deve ter pelo menos 6 caracteres."),
            None,
        ));
    }
    if form.new_password != form.confirm_password {
        return Ok(render_settings(
            &user,
            sessions,
            Some("As senhas não coincidem"),
            None,
        ));
    }

    let creds = db::user_credentials(&conn, &user.email).map_err(|_| Redirect::to("/login"))?;
    let Some((_user_id, hash)) = creds else {
        return Ok(render_settings(
            &user,
            sessions,
            Some("Usuário não encontrado"),
            None,
        ));
    };
    if !auth::verify_password(&hash, &form.current_password) {
        return Ok(render_settings(
            &user,
            sessions,
            Some("Senha atual incorreta"),
            None,
        ));
    }

    let new_hash = auth::hash_password(&form.new_password).map_err(|_| Redirect::to("/login"))?;
    db::update_password(&conn, user.id, &new_hash).map_err(|_| Redirect::to("/login"))?;
    Ok(render_settings(&user, sessions, None, Some("Senha atualizada")))
}

#[post("/settings/logout_all")]
pub fn logout_all(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Redirect {
    if let Ok(conn) = pool.get() {
        if let Some(user) = auth::current_user(pool, cookies) {
            let _ = db::delete_sessions_for_user(&conn, user.id);
        }
    }
    let mut cookie = rocket::http::Cookie::named("session");
    cookie.set_path("/");
    cookies.remove(cookie);
    Redirect::to("/login")
}

#[post("/settings/import", data = "<form>")]
pub fn import_legacy(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<ImportForm>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;
    let sessions = db::session_count(&conn, user.id).unwrap_or(1);

    let payload = form.into_inner().payload;
    if payload.trim().is_empty() {
        return Ok(render_settings(
            &user,
            sessions,
            Some("Cole o conteúdo do arquivo exportado"),
            None,
        ));
    }

    match migrate::import_legacy(&conn, user.id, &payload) {
        Ok(summary) => {
            let mut notice = format!(
                "Importados: {} custos fixos, {} pastas, {} notas",
                summary.fixed_costs, summary.folders, summary.notes
            );
            if summary.notes_skipped {
                notice.push_str(" (notas ignoradas: a conta já possui notas)");
            }
            Ok(render_settings(&user, sessions, None, Some(&notice)))
        }
        Err(_) => Ok(render_settings(
            &user,
            sessions,
            Some("Arquivo inválido: não foi possível importar"),
            None,
        )),
    }
}

#[get("/settings/export")]
pub fn export_account(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
) -> Result<JsonDownload, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(_) => return Err(Status::Unauthorized),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let export =
        migrate::export_account(&conn, user.id).map_err(|_| Status::InternalServerError)?;
    let body =
        serde_json::to_string_pretty(&export).map_err(|_| Status::InternalServerError)?;
    Ok(JsonDownload {
        body,
        disposition: Header::new(
            "Content-Disposition",
            "attachment; filename=\"organafin-export.json\"",
        ),
    })
}
