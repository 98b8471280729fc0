use actix_web::{HttpResponse, middleware, web};

use crate::auth::middleware::{require_auth, require_json_content_type};
use crate::handlers::{auth, editor, preview, selector, templates, upload};

fn redirect_to_editor() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", "/editor"))
        .finish()
}

/// All application routes. Session middleware and `web::Data<AppState>`
/// are registered by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(actix_files::Files::new("/static", "./static"))
        // Public routes
        .route("/", web::get().to(|| async { redirect_to_editor() }))
        .route("/login", web::get().to(auth::login_page))
        .route("/login", web::post().to(auth::login_submit))
        .route("/register", web::get().to(auth::register_page))
        .route("/register", web::post().to(auth::register_submit))
        // JSON API
        .service(
            web::scope("/api")
                .wrap(middleware::from_fn(require_json_content_type))
                .route("/register", web::post().to(auth::api_register))
                .route("/login", web::post().to(auth::api_login))
                .route("/logout", web::post().to(auth::api_logout))
                .route("/user", web::get().to(auth::api_user))
                .route("/upload/html", web::post().to(upload::upload_html))
                .route("/editor/parse", web::post().to(editor::parse))
                .route("/editor/generate", web::post().to(editor::generate))
                .route("/editor/update", web::post().to(editor::update))
                .route("/editor/images", web::post().to(editor::images))
                .route("/editor/inline", web::post().to(editor::inline))
                .route("/editor/export", web::post().to(editor::export))
                .route("/selector/suggest", web::post().to(selector::suggest))
                .route("/selector/preview", web::post().to(selector::preview))
                .route("/selector/assign", web::post().to(selector::assign))
                .route("/selector/annotate", web::post().to(selector::annotate))
                .route("/selector/pick", web::post().to(selector::pick))
                .route("/preview", web::post().to(preview::preview))
                .service(
                    web::scope("/templates")
                        .wrap(middleware::from_fn(require_auth))
                        .route("", web::get().to(templates::list))
                        .route("", web::post().to(templates::create))
                        .route("/{id}", web::get().to(templates::get))
                        .route("/{id}", web::put().to(templates::update))
                        .route("/{id}", web::delete().to(templates::delete))
                        .route("/{id}/versions", web::get().to(templates::versions))
                        .route("/{id}/restore/{version_id}", web::post().to(templates::restore)),
                ),
        )
        // Protected pages
        .service(
            web::scope("")
                .wrap(middleware::from_fn(require_auth))
                .route("/editor", web::get().to(editor::page))
                .route("/editor", web::post().to(editor::submit))
                .route("/templates", web::get().to(templates::page))
                .route("/logout", web::post().to(auth::logout)),
        );
}

/// Fallback for unmatched paths.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../templates/errors/404.html"))
}
