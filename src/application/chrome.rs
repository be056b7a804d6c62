use std::sync::Arc;

use crate::{
    application::{
        error::HttpError,
        posts::{PostService, TagCount},
    },
    config::SiteSettings,
    domain::tags::TagKind,
    presentation::views::{
        BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
        SidebarView, TagBadge,
    },
};

/// Builds the shared page frame: brand, navigation, footer and the tag sidebar.
#[derive(Clone)]
pub struct ChromeService {
    posts: Arc<PostService>,
    site: SiteSettings,
}

impl ChromeService {
    pub fn new(posts: Arc<PostService>, site: SiteSettings) -> Self {
        Self { posts, site }
    }

    pub async fn load(&self) -> Result<LayoutChrome, HttpError> {
        let summary = self.posts.tag_summary().await?;

        Ok(LayoutChrome {
            sidebar: SidebarView {
                main_tags: badges(TagKind::Main, &summary.main),
                sub_tags: badges(TagKind::Sub, &summary.sub),
            },
            ..self.fallback()
        })
    }

    /// Frame without the sidebar, for pages rendered after a Notion failure.
    pub fn fallback(&self) -> LayoutChrome {
        LayoutChrome {
            brand: BrandView {
                title: self.site.title.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView {
                entries: vec![
                    NavigationLinkView {
                        label: "Home".to_string(),
                        href: "/".to_string(),
                    },
                    NavigationLinkView {
                        label: "Posts".to_string(),
                        href: "/posts".to_string(),
                    },
                ],
            },
            footer: FooterView {
                copy: format!("© {}", self.site.title),
            },
            meta: PageMetaView {
                title: self.site.title.clone(),
                description: self.site.description.clone(),
            },
            sidebar: SidebarView::default(),
        }
    }
}

fn badges(kind: TagKind, counts: &[TagCount]) -> Vec<TagBadge> {
    counts
        .iter()
        .map(|tag| TagBadge::new(kind, &tag.name).with_count(tag.count))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, time::Duration};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::application::{
        posts::PostServiceConfig,
        source::{NotionSource, SourceError},
    };

    struct OnePage;

    #[async_trait]
    impl NotionSource for OnePage {
        async fn query_all_pages(&self, _database_id: &str) -> Result<Vec<Value>, SourceError> {
            Ok(vec![json!({
                "id": "p1",
                "created_time": "2024-01-01T00:00:00.000Z",
                "last_edited_time": "2024-01-01T00:00:00.000Z",
                "properties": {
                    "Title": {"type": "title", "title": [{"plain_text": "Hello"}]},
                    "MainTags": {"type": "multi_select", "multi_select": [{"name": "backend"}]},
                    "SubTags": {"type": "multi_select", "multi_select": [{"name": "Notion"}]}
                }
            })])
        }

        async fn list_child_blocks(&self, _block_id: &str) -> Result<Vec<Value>, SourceError> {
            Ok(Vec::new())
        }

        async fn retrieve_page(&self, _page_id: &str) -> Result<Value, SourceError> {
            Err(SourceError::NotFound)
        }
    }

    fn service() -> ChromeService {
        let posts = PostService::new(
            Arc::new(OnePage),
            PostServiceConfig {
                database_id: "db".to_string(),
                list_ttl: Duration::ZERO,
                post_capacity: NonZeroUsize::new(4).expect("non-zero"),
                log_schema: false,
            },
        );
        ChromeService::new(
            Arc::new(posts),
            SiteSettings {
                title: "Tech Blog".to_string(),
                description: "Notes".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn sidebar_lists_tag_counts() {
        let chrome = service().load().await.expect("chrome");

        assert_eq!(chrome.brand.title, "Tech Blog");
        assert_eq!(chrome.sidebar.main_tags.len(), 1);
        assert_eq!(chrome.sidebar.main_tags[0].label, "backend");
        assert_eq!(chrome.sidebar.main_tags[0].count, Some(1));
        assert_eq!(chrome.sidebar.sub_tags[0].href, "/tags/Notion");
    }

    #[test]
    fn fallback_has_no_sidebar() {
        assert!(service().fallback().sidebar.is_empty());
    }
}
