use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{application::error::HttpError, domain::entities::PostRecord};

const RENDER_SOURCE: &str = "presentation::views::render_template";

/// Render `template` into HTML, mapping askama failures to a `500` [`HttpError`].
pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err: AskamaError| {
        HttpError::from_error(
            RENDER_SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            &err,
        )
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Clone)]
pub struct PostRowView {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub likes: u64,
    pub like_href: String,
    pub edit_href: String,
    pub delete_href: String,
}

impl From<&PostRecord> for PostRowView {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            author: post.author.clone(),
            content: post.content.clone(),
            likes: post.likes,
            like_href: format!("/like/{}", post.id),
            edit_href: format!("/update/{}", post.id),
            delete_href: format!("/delete/{}", post.id),
        }
    }
}

#[derive(Clone)]
pub struct PostListView {
    pub posts: Vec<PostRowView>,
    pub add_href: &'static str,
}

impl PostListView {
    pub fn new(posts: &[PostRecord]) -> Self {
        Self {
            posts: posts.iter().map(PostRowView::from).collect(),
            add_href: "/add",
        }
    }
}

/// Values behind the add and edit forms; both share one template.
#[derive(Clone)]
pub struct PostFormView {
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub title: String,
    pub author: String,
    pub content: String,
}

impl PostFormView {
    pub fn new_post() -> Self {
        Self {
            heading: "New post",
            action: "/add".to_string(),
            submit_label: "Publish",
            title: String::new(),
            author: String::new(),
            content: String::new(),
        }
    }

    pub fn edit_post(post: &PostRecord) -> Self {
        Self {
            heading: "Edit post",
            action: format!("/update/{}", post.id),
            submit_label: "Save",
            title: post.title.clone(),
            author: post.author.clone(),
            content: post.content.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: PostListView,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: PostFormView,
}
