use chrono::{DateTime, Local};
use rocket::form::Form;
use rocket::http::{CookieJar, Header, Status};
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::{self, DbPool};
use crate::models::NoteRecord;

const DEFAULT_NOTE_TITLE: &str = "Nova Nota";

#[derive(FromForm)]
pub struct FolderForm {
    name: String,
}

#[derive(FromForm)]
pub struct NewNoteForm {
    folder_id: i64,
    title: String,
}

#[derive(FromForm)]
pub struct DeleteNoteForm {
    folder_id: i64,
}

#[derive(Deserialize)]
pub struct NoteUpdate {
    title: String,
    content: String,
}

#[derive(Responder)]
#[response(content_type = "text/plain; charset=utf-8")]
pub struct TextDownload {
    body: String,
    disposition: Header<'static>,
}

#[derive(Serialize)]
struct NoteView {
    id: i64,
    title: String,
    updated: String,
}

fn fmt_updated(iso: &str) -> String {
    DateTime::parse_from_rfc3339(iso)
        .map(|d| d.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

#[get("/notes?<folder>&<note>")]
pub fn notes(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    folder: Option<i64>,
    note: Option<i64>,
) -> Result<Template, Redirect> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool.get().map_err(|_| Redirect::to("/login"))?;

    let folders = db::list_note_folders(&conn, user.id).unwrap_or_default();
    let selected_folder = folder.filter(|id| folders.iter().any(|f| f.id == *id));

    let folder_notes = match selected_folder {
        Some(folder_id) => db::list_notes_in_folder(&conn, user.id, folder_id).unwrap_or_default(),
        None => Vec::new(),
    };
    let selected_note = note.and_then(|id| folder_notes.iter().find(|n| n.id == id));

    let note_views: Vec<NoteView> = folder_notes
        .iter()
        .map(|n| NoteView {
            id: n.id,
            title: n.title.clone(),
            updated: fmt_updated(&n.updated_at),
        })
        .collect();
    let selected_folder_name = selected_folder.and_then(|id| {
        folders
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.name.clone())
    });

    let context = serde_json::json!({
        "active": "notes",
        "username": auth::display_name(&user),
        "folders": folders,
        "selected_folder": selected_folder,
        "selected_folder_name": selected_folder_name,
        "notes": note_views,
        "selected_note": selected_note,
    });
    Ok(Template::render("notes", &context))
}

#[post("/notes/folders", data = "<form>")]
pub fn create_folder(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<FolderForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let name = form.into_inner().name.trim().to_string();
    if name.is_empty() {
        return Ok(Redirect::to("/notes"));
    }
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let created_at = Local::now().to_rfc3339();
    let id = db::insert_note_folder(&conn, user.id, &name, &created_at)
        .map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to(format!("/notes?folder={id}")))
}

#[post("/notes/folders/<id>", data = "<form>")]
pub fn rename_folder(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<FolderForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let name = form.into_inner().name.trim().to_string();
    if !name.is_empty() {
        let conn = pool.get().map_err(|_| Status::InternalServerError)?;
        db::rename_note_folder(&conn, user.id, id, &name)
            .map_err(|_| Status::InternalServerError)?;
    }
    Ok(Redirect::to(format!("/notes?folder={id}")))
}

#[post("/notes/folders/<id>/delete")]
pub fn delete_folder(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::delete_note_folder(&conn, user.id, id).map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to("/notes"))
}

#[post("/notes", data = "<form>")]
pub fn create_note(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    form: Form<NewNoteForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let form = form.into_inner();
    let title = {
        let trimmed = form.title.trim();
        if trimmed.is_empty() {
            DEFAULT_NOTE_TITLE
        } else {
            trimmed
        }
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let updated_at = Local::now().to_rfc3339();
    let id = db::insert_note(&conn, user.id, form.folder_id, title, "", &updated_at)
        .map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to(format!(
        "/notes?folder={}&note={id}",
        form.folder_id
    )))
}

/// Autosave endpoint for the note editor; the page debounces edits and
/// posts the whole title/content pair. Returns the stored note so the
/// client can refresh its list entry.
#[post("/notes/<id>", format = "json", data = "<update>")]
pub fn save_note(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    update: Json<NoteUpdate>,
) -> Result<Json<NoteRecord>, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(_) => return Err(Status::Unauthorized),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::note_by_id(&conn, user.id, id)
        .map_err(|_| Status::InternalServerError)?
        .ok_or(Status::NotFound)?;

    let update = update.into_inner();
    let updated_at = Local::now().to_rfc3339();
    db::update_note(&conn, user.id, id, &update.title, &update.content, &updated_at)
        .map_err(|_| Status::InternalServerError)?;

    let note = db::note_by_id(&conn, user.id, id)
        .map_err(|_| Status::InternalServerError)?
        .ok_or(Status::NotFound)?;
    Ok(Json(note))
}

#[post("/notes/<id>/delete", data = "<form>")]
pub fn delete_note(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
    form: Form<DeleteNoteForm>,
) -> Result<Redirect, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    db::delete_note(&conn, user.id, id).map_err(|_| Status::InternalServerError)?;
    Ok(Redirect::to(format!("/notes?folder={}", form.folder_id)))
}

#[get("/notes/<id>/download")]
pub fn download_note(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    id: i64,
) -> Result<TextDownload, Status> {
    let user = match auth::require_user(pool, cookies) {
        Ok(user) => user,
        Err(_) => return Err(Status::Unauthorized),
    };
    let conn = pool.get().map_err(|_| Status::InternalServerError)?;
    let note = db::note_by_id(&conn, user.id, id)
        .map_err(|_| Status::InternalServerError)?
        .ok_or(Status::NotFound)?;

    let filename = if note.title.trim().is_empty() {
        "nota".to_string()
    } else {
        note.title.replace('"', "'")
    };
    Ok(TextDownload {
        body: format!("{}\n\n{}", note.title, note.content),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}.txt\""),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updated_timestamp_is_humanized() {
        assert_eq!(fmt_updated("2026-08-07T14:30:00-03:00"), "07/08/2026 14:30");
        assert_eq!(fmt_updated("not a timestamp"), "not a timestamp");
    }
}
