//! Post listing, lookup and tag aggregation over the Notion database.

use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    application::{
        fetcher::BlockTreeFetcher,
        render::{render, render_html},
        source::{NotionSource, SourceError},
    },
    domain::{
        blocks::Block,
        posts::{Post, RawPage, SchemaProbe, sort_newest_first, to_post},
        tags::{TagKind, tag_color},
    },
};

pub const METRIC_POST_CACHE_HIT: &str = "post_cache_hit_total";
pub const METRIC_POST_CACHE_MISS: &str = "post_cache_miss_total";

const SOURCE: &str = "notion_blog::application::posts";

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("page `{page_id}` could not be decoded: {message}")]
    InvalidPage { page_id: String, message: String },
}

#[derive(Debug, Clone)]
pub struct PostServiceConfig {
    pub database_id: String,
    /// Zero disables caching.
    pub list_ttl: Duration,
    pub post_capacity: NonZeroUsize,
    pub log_schema: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub main: Vec<TagCount>,
    pub sub: Vec<TagCount>,
}

struct PostCache {
    list: Option<(Instant, Arc<Vec<Post>>)>,
    details: LruCache<String, (Instant, Post)>,
}

pub struct PostService {
    source: Arc<dyn NotionSource>,
    fetcher: BlockTreeFetcher,
    database_id: String,
    list_ttl: Duration,
    probe: SchemaProbe,
    cache: Mutex<PostCache>,
}

impl PostService {
    pub fn new(source: Arc<dyn NotionSource>, config: PostServiceConfig) -> Self {
        Self {
            fetcher: BlockTreeFetcher::new(Arc::clone(&source)),
            source,
            database_id: config.database_id,
            list_ttl: config.list_ttl,
            probe: SchemaProbe::new(config.log_schema),
            cache: Mutex::new(PostCache {
                list: None,
                details: LruCache::new(config.post_capacity),
            }),
        }
    }

    /// All mapped posts, newest first, optionally restricted to published ones.
    pub async fn list_posts(&self, published_only: bool) -> Result<Vec<Post>, PostError> {
        let posts = self.all_posts().await?;
        Ok(posts
            .iter()
            .filter(|post| !published_only || post.is_published)
            .cloned()
            .collect())
    }

    /// First post (published or not) whose slug equals `slug`, with content.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, PostError> {
        let key = format!("slug:{slug}");
        if let Some(post) = self.cached_detail(&key).await {
            return Ok(Some(post));
        }

        let posts = self.all_posts().await?;
        let Some(post) = posts.iter().find(|post| post.slug == slug).cloned() else {
            return Ok(None);
        };

        let content = self.fetcher.fetch_tree(&post.id).await?;
        let post = post.with_content(content);
        self.store_detail(key, &post).await;
        Ok(Some(post))
    }

    /// Post for a single page id, with content. `None` when the page does not
    /// exist or carries no properties.
    pub async fn find_by_id(&self, page_id: &str) -> Result<Option<Post>, PostError> {
        let key = format!("id:{page_id}");
        if let Some(post) = self.cached_detail(&key).await {
            return Ok(Some(post));
        }

        let value = match self.source.retrieve_page(page_id).await {
            Ok(value) => value,
            Err(SourceError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let page = RawPage::from_value(value).map_err(|err| PostError::InvalidPage {
            page_id: page_id.to_string(),
            message: err.to_string(),
        })?;
        if page.properties.is_none() {
            return Ok(None);
        }

        let content = self.fetcher.fetch_tree(&page.id).await?;
        let post = to_post(&page).with_content(content);
        self.store_detail(key, &post).await;
        Ok(Some(post))
    }

    /// Rows of a table block.
    pub async fn table_rows(&self, block_id: &str) -> Result<Vec<Block>, PostError> {
        Ok(self.fetcher.fetch_table_rows(block_id).await?)
    }

    /// Published posts carrying `tag` (case-insensitive).
    pub async fn posts_tagged(&self, tag: &str) -> Result<Vec<Post>, PostError> {
        let posts = self.all_posts().await?;
        Ok(posts
            .iter()
            .filter(|post| post.is_published && post.has_tag(tag))
            .cloned()
            .collect())
    }

    /// Main and sub tag counts over published posts, most used first.
    pub async fn tag_summary(&self) -> Result<TagSummary, PostError> {
        let posts = self.all_posts().await?;
        let published = posts.iter().filter(|post| post.is_published);

        let mut main = BTreeMap::<&str, usize>::new();
        let mut sub = BTreeMap::<&str, usize>::new();
        for post in published {
            for tag in &post.main_tags {
                *main.entry(tag.as_str()).or_default() += 1;
            }
            for tag in &post.sub_tags {
                *sub.entry(tag.as_str()).or_default() += 1;
            }
        }

        Ok(TagSummary {
            main: tag_counts(main, TagKind::Main),
            sub: tag_counts(sub, TagKind::Sub),
        })
    }

    /// HTML for a post's content. Table rows are fetched here so tables
    /// render server-side; tables whose rows fail to load stay deferred.
    pub async fn render_content(&self, post: &Post) -> String {
        let Some(content) = post.content.clone() else {
            return String::new();
        };
        let content = self.fetcher.hydrate_tables(content).await;
        render_html(&render(&content))
    }

    /// Raw property bag of the first database page, for schema inspection.
    pub async fn first_page(&self) -> Result<Option<RawPage>, PostError> {
        let pages = self.source.query_all_pages(&self.database_id).await?;
        Ok(pages
            .into_iter()
            .find_map(|value| decode_page(value).filter(|page| page.properties.is_some())))
    }

    async fn all_posts(&self) -> Result<Arc<Vec<Post>>, PostError> {
        if !self.list_ttl.is_zero() {
            let cache = self.cache.lock().await;
            if let Some((stored_at, posts)) = cache.list.as_ref()
                && stored_at.elapsed() < self.list_ttl
            {
                counter!(METRIC_POST_CACHE_HIT, "kind" => "list").increment(1);
                return Ok(Arc::clone(posts));
            }
        }
        counter!(METRIC_POST_CACHE_MISS, "kind" => "list").increment(1);

        let pages = self.source.query_all_pages(&self.database_id).await?;
        let mut posts = Vec::with_capacity(pages.len());
        for page in pages.into_iter().filter_map(decode_page) {
            if page.properties.is_none() {
                debug!(target = SOURCE, page_id = %page.id, "skipping page without properties");
                continue;
            }
            self.probe.observe(&page);
            posts.push(to_post(&page));
        }
        sort_newest_first(&mut posts);

        let posts = Arc::new(posts);
        if !self.list_ttl.is_zero() {
            self.cache.lock().await.list = Some((Instant::now(), Arc::clone(&posts)));
        }
        Ok(posts)
    }

    async fn cached_detail(&self, key: &str) -> Option<Post> {
        if self.list_ttl.is_zero() {
            return None;
        }

        let mut cache = self.cache.lock().await;
        let hit = match cache.details.get(key) {
            Some((stored_at, post)) if stored_at.elapsed() < self.list_ttl => Some(post.clone()),
            _ => None,
        };

        match hit {
            Some(post) => {
                counter!(METRIC_POST_CACHE_HIT, "kind" => "detail").increment(1);
                Some(post)
            }
            None => {
                cache.details.pop(key);
                counter!(METRIC_POST_CACHE_MISS, "kind" => "detail").increment(1);
                None
            }
        }
    }

    async fn store_detail(&self, key: String, post: &Post) {
        if self.list_ttl.is_zero() {
            return;
        }
        self.cache
            .lock()
            .await
            .details
            .put(key, (Instant::now(), post.clone()));
    }
}

fn decode_page(value: Value) -> Option<RawPage> {
    match RawPage::from_value(value) {
        Ok(page) => Some(page),
        Err(err) => {
            warn!(target = SOURCE, error = %err, "skipping undecodable page");
            None
        }
    }
}

fn tag_counts(counts: BTreeMap<&str, usize>, kind: TagKind) -> Vec<TagCount> {
    let mut tags: Vec<TagCount> = counts
        .into_iter()
        .map(|(name, count)| TagCount {
            name: name.to_string(),
            count,
            color: tag_color(kind, name),
        })
        .collect();
    // BTreeMap order breaks ties by name.
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags
}
