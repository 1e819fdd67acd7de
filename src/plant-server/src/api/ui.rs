//! UI serving routes

use axum::response::Html;

use crate::views;

/// GET /
///
/// Upload form posting to `/predict`
pub async fn serve_index() -> Html<String> {
    Html(views::index_page())
}

/// GET /navegacion
pub async fn serve_navigation() -> Html<String> {
    Html(views::navigation_page())
}

/// GET /pagina_juego
///
/// Game page running `/static/script.js`
pub async fn serve_game() -> Html<String> {
    Html(views::game_page())
}
