use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, FromRequest, Multipart, Path, Request, State},
    http::{
        StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        posts::PostService,
    },
    domain::entities::PostDraft,
    presentation::views::{
        IndexTemplate, PostFormTemplate, PostFormView, PostListView, render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(list_posts))
        .route("/add", get(new_post_form).post(create_post))
        .route("/update/{post_id}", get(edit_post_form).post(update_post))
        .route("/delete/{post_id}", get(delete_post))
        .route("/like/{post_id}", get(like_post))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Submitted post fields. Absent fields are taken as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PostForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) content: String,
}

impl From<PostForm> for PostDraft {
    fn from(form: PostForm) -> Self {
        Self {
            title: form.title,
            author: form.author,
            content: form.content,
        }
    }
}

/// Post fields read from either a urlencoded or a multipart body.
///
/// Requests without a form body submit empty fields rather than being rejected.
pub(crate) struct PostSubmission(pub(crate) PostForm);

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<PostForm>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(form));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return read_multipart(multipart)
                .await
                .map(Self)
                .map_err(IntoResponse::into_response);
        }

        Ok(Self(PostForm::default()))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    const SOURCE: &str = "infra::http::read_multipart";

    let invalid = |err: &dyn std::error::Error| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid form submission",
            err,
        )
    };

    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|err| invalid(&err))? {
        let slot = match field.name() {
            Some("title") => &mut form.title,
            Some("author") => &mut form.author,
            Some("content") => &mut form.content,
            _ => continue,
        };
        *slot = field.text().await.map_err(|err| invalid(&err))?;
    }

    Ok(form)
}

async fn list_posts(State(state): State<HttpState>) -> Response {
    match state.posts.list().await {
        Ok(posts) => {
            let view = PostListView::new(&posts);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from_post_error("infra::http::list_posts", err).into_response(),
    }
}

async fn new_post_form() -> Response {
    render_template_response(
        PostFormTemplate {
            view: PostFormView::new_post(),
        },
        StatusCode::OK,
    )
}

async fn create_post(
    State(state): State<HttpState>,
    PostSubmission(form): PostSubmission,
) -> Response {
    match state.posts.create(form.into()).await {
        Ok(_) => redirect_to_index(),
        Err(err) => HttpError::from_post_error("infra::http::create_post", err).into_response(),
    }
}

async fn edit_post_form(State(state): State<HttpState>, Path(post_id): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::edit_post_form";

    let id = match parse_post_id(SOURCE, &post_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.posts.find(id).await {
        Ok(Some(post)) => render_template_response(
            PostFormTemplate {
                view: PostFormView::edit_post(&post),
            },
            StatusCode::OK,
        ),
        Ok(None) => post_not_found(SOURCE, id).into_response(),
        Err(err) => HttpError::from_post_error(SOURCE, err).into_response(),
    }
}

async fn update_post(
    State(state): State<HttpState>,
    Path(post_id): Path<String>,
    PostSubmission(form): PostSubmission,
) -> Response {
    const SOURCE: &str = "infra::http::update_post";

    let id = match parse_post_id(SOURCE, &post_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.posts.update(id, form.into()).await {
        Ok(_) => redirect_to_index(),
        Err(err) => HttpError::from_post_error(SOURCE, err).into_response(),
    }
}

/// Unknown ids are not an error here; the list is shown either way.
async fn delete_post(State(state): State<HttpState>, Path(post_id): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::delete_post";

    let id = match parse_post_id(SOURCE, &post_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.posts.delete(id).await {
        Ok(_) => redirect_to_index(),
        Err(err) => HttpError::from_post_error(SOURCE, err).into_response(),
    }
}

/// Unknown ids are not an error here; the list is shown either way.
async fn like_post(State(state): State<HttpState>, Path(post_id): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::like_post";

    let id = match parse_post_id(SOURCE, &post_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.posts.like(id).await {
        Ok(_) => redirect_to_index(),
        Err(err) => HttpError::from_post_error(SOURCE, err).into_response(),
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    match state.posts.list().await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// `302 Found` back to the post list.
fn redirect_to_index() -> Response {
    (StatusCode::FOUND, [(LOCATION, "/")]).into_response()
}

/// Accept only plain decimal digits, so `+1` or `-1` do not match a post route.
fn parse_post_id(source: &'static str, raw: &str) -> Result<u64, HttpError> {
    let not_found = || {
        HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Not found",
            format!("`{raw}` is not a post id"),
        )
    };

    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(not_found());
    }
    raw.parse().map_err(|_| not_found())
}

fn post_not_found(source: &'static str, id: u64) -> HttpError {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Post not found",
        format!("post `{id}` does not exist"),
    )
}
