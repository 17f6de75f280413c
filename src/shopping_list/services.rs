use std::fmt::Write;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::repo::{self, ShoppingLine};
use crate::{error::AppResult, state::AppState};

pub const HEADER: &str = "Список ингредиентов";
pub const FILENAME: &str = "shopping_list.txt";

/// Numbered plain-text list; an empty cart renders just the header.
pub fn render(lines: &[ShoppingLine]) -> String {
    let mut out = format!("{}\n\n", HEADER);
    for (i, line) in lines.iter().enumerate() {
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "<{}> {} - {}, {}",
            i + 1,
            line.name,
            line.total,
            line.measurement_unit
        );
    }
    out
}

pub fn attachment(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", FILENAME),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn download(st: &AppState, user_id: Uuid) -> AppResult<Response> {
    let lines = repo::totals_for(&st.db, user_id).await?;
    tracing::debug!(user_id = %user_id, lines = lines.len(), "shopping list rendered");
    Ok(attachment(render(&lines)))
}
