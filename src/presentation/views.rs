use crate::{
    application::error::{ErrorReport, HttpError},
    domain::{
        posts::{Post, parse_timestamp},
        tags::{TagKind, is_dark, tag_color},
    },
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use time::{format_description::BorrowedFormatItem, macros::format_description};

/// Characters escaped in a single path segment (RFC 3986 unreserved stay as is).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Error page for a failed request. The report from `err` stays attached to
/// the response for the logging middleware.
pub fn render_error_response(chrome: LayoutChrome, err: HttpError) -> Response {
    let status = err.status();
    let content = ErrorPageView::failure(status, err.public_message());
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    err.into_report().attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone, Default)]
pub struct SidebarView {
    pub main_tags: Vec<TagBadge>,
    pub sub_tags: Vec<TagBadge>,
}

impl SidebarView {
    pub fn is_empty(&self) -> bool {
        self.main_tags.is_empty() && self.sub_tags.is_empty()
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub sidebar: SidebarView,
}

impl LayoutChrome {
    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub sidebar: SidebarView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            sidebar: chrome.sidebar,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

impl PageMetaView {
    /// Meta for a sub-page: `"{page} | {site}"`.
    pub fn with_content(self, page_title: &str, description: Option<&str>) -> Self {
        let description = description
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or(self.description, str::to_string);
        Self {
            title: format!("{page_title} | {}", self.title),
            description,
        }
    }
}

/// Coloured tag chip linking to the tag's post list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagBadge {
    pub label: String,
    pub href: String,
    pub color: &'static str,
    pub text_color: &'static str,
    pub count: Option<usize>,
}

impl TagBadge {
    pub fn new(kind: TagKind, name: &str) -> Self {
        let color = tag_color(kind, name);
        let text_color = if is_dark(color) { "#ffffff" } else { "#1f2937" };
        Self {
            label: name.to_string(),
            href: tag_href(name),
            color,
            text_color,
            count: None,
        }
    }

    pub fn with_count(self, count: usize) -> Self {
        Self {
            count: Some(count),
            ..self
        }
    }
}

pub fn tag_href(tag: &str) -> String {
    format!("/tags/{}", utf8_percent_encode(tag, PATH_SEGMENT))
}

pub fn post_href(slug: &str) -> String {
    format!("/posts/{}", utf8_percent_encode(slug, PATH_SEGMENT))
}

/// `YYYY-MM-DD` for an upstream timestamp; the raw value when unparsable.
pub fn display_date(value: &str) -> String {
    parse_timestamp(value)
        .and_then(|timestamp| timestamp.format(DATE_FORMAT).ok())
        .unwrap_or_else(|| value.to_string())
}

pub fn post_badges(post: &Post) -> Vec<TagBadge> {
    post.main_tags
        .iter()
        .map(|tag| TagBadge::new(TagKind::Main, tag))
        .chain(post.sub_tags.iter().map(|tag| TagBadge::new(TagKind::Sub, tag)))
        .collect()
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub summary: Option<String>,
    pub iso_date: String,
    pub published: String,
    pub cover_image: Option<String>,
    pub badges: Vec<TagBadge>,
    pub is_featured: bool,
    pub is_draft: bool,
}

impl From<&Post> for PostCard {
    fn from(post: &Post) -> Self {
        Self {
            href: post_href(&post.slug),
            title: display_title(&post.title),
            summary: post.summary.clone(),
            iso_date: post.created_at.clone(),
            published: display_date(&post.created_at),
            cover_image: post.cover_image.clone(),
            badges: post_badges(post),
            is_featured: post.is_featured,
            is_draft: !post.is_published,
        }
    }
}

fn display_title(title: &str) -> String {
    if title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        title.to_string()
    }
}

pub struct IndexView {
    pub featured: Vec<PostCard>,
    pub recent: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct PostListView {
    pub heading: String,
    pub active_tag: Option<TagBadge>,
    pub posts: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "posts.html")]
pub struct PostListTemplate {
    pub view: LayoutContext<PostListView>,
}

pub struct PostDetailView {
    pub title: String,
    pub serial: Option<String>,
    pub summary: Option<String>,
    pub iso_date: String,
    pub published: String,
    pub updated: String,
    pub cover_image: Option<String>,
    pub badges: Vec<TagBadge>,
    pub is_draft: bool,
    pub content_html: String,
}

impl PostDetailView {
    pub fn new(post: &Post, content_html: String) -> Self {
        Self {
            title: display_title(&post.title),
            serial: post.serial.clone(),
            summary: post.summary.clone(),
            iso_date: post.created_at.clone(),
            published: display_date(&post.created_at),
            updated: display_date(&post.last_edited_at),
            cover_image: post.cover_image.clone(),
            badges: post_badges(post),
            is_draft: !post.is_published,
            content_html,
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage to continue exploring.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn failure(status: StatusCode, message: &str) -> Self {
        Self {
            title: status
                .canonical_reason()
                .unwrap_or("Something went wrong")
                .to_string(),
            message: format!("{message}. Please try again in a moment."),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
