//! Help page, liveness probe and unknown paths

use axum::{
    http::{StatusCode, Uri},
    response::Html,
    Json,
};

use crate::models::ErrorResponse;

const HELP_PAGE: &str = r#"<html>
<head><title>HistoryDB</title></head>
<body>
<h3>Add activity</h3>
<form name="add" action="add_activity" method="post">
  User name: <input type="text" name="user" value="WebUser1"><br>
  Timestamp: <input type="text" name="timestamp" value=""><br>
  Data: <input type="text" name="data" value="Some data"><br>
  Key: <input type="text" name="key" value=""><br>
  <input type="submit" value="Send">
</form>
<h3>Get active users</h3>
<form name="get_users" action="get_active_users" method="get">
  Timestamp: <input type="text" name="timestamp" value=""><br>
  Key: <input type="text" name="key" value=""><br>
  <input type="submit" value="Send">
</form>
<h3>Get user logs</h3>
<form name="get_logs" action="get_user_logs" method="get">
  User name: <input type="text" name="user" value="WebUser1"><br>
  Begin timestamp: <input type="text" name="begin_time" value=""><br>
  End timestamp: <input type="text" name="end_time" value=""><br>
  <input type="submit" value="Send">
</form>
</body>
</html>
"#;

/// `GET /`
pub async fn help() -> Html<&'static str> {
    Html(HELP_PAGE)
}

/// `GET /test`
pub async fn test() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    tracing::debug!(uri = %uri, "Request for unknown path");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no route for {}", uri.path()),
        }),
    )
}
