use axum::response::Html;

/// Landing page pointing at the JSON API.
pub async fn index() -> Html<&'static str> {
    Html(
        "<h1>Syllabus</h1>\
         <p>JSON API: <a href=\"/api/subjects\">/api/subjects</a>, \
         <a href=\"/api/courses\">/api/courses</a></p>",
    )
}

pub async fn healthz() -> &'static str {
    "ok"
}
