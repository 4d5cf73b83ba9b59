//! Post listing model: raw query parameters, the store filter they resolve
//! to, sort modes and pagination.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post::{Category, Post, PostWithAuthor};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Listing parameters exactly as they arrive on the query string.
///
/// Everything is kept as raw text so that malformed values can be coerced to
/// defaults instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub cat: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub featured: Option<String>,
}

impl ListingParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_params(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn sort_mode(&self) -> SortMode {
        SortMode::from_param(self.sort.as_deref())
    }

    /// The requested category. `Some(None)` means a category was asked for
    /// that no post can have.
    pub fn category(&self) -> Option<Option<Category>> {
        self.cat
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| c.parse().ok())
    }

    pub fn featured(&self) -> Option<bool> {
        match self.featured.as_deref().map(str::trim) {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            _ => None,
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|a| !a.trim().is_empty())
    }
}

/// Ordering of a post listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    /// Most visited first.
    Popular,
    /// Most visited first, newest first among equal visit counts.
    Trending,
}

impl SortMode {
    /// Unrecognized values fall back to newest-first.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("oldest") => SortMode::Oldest,
            Some("popular") | Some("most-visited") => SortMode::Popular,
            Some("trending") => SortMode::Trending,
            _ => SortMode::Newest,
        }
    }

    /// Compare two posts under this ordering. Ties beyond the sort keys are
    /// left to the caller's natural order.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        match self {
            SortMode::Newest => b.created_at.cmp(&a.created_at),
            SortMode::Oldest => a.created_at.cmp(&b.created_at),
            SortMode::Popular => b.visit.cmp(&a.visit),
            SortMode::Trending => b
                .visit
                .cmp(&a.visit)
                .then_with(|| b.created_at.cmp(&a.created_at)),
        }
    }
}

/// 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// `page` is capped so that [`offset`](Self::offset) always fits a
    /// signed 64-bit SQL parameter.
    pub fn new(page: u64, limit: u64) -> Self {
        let limit = limit.clamp(1, MAX_LIMIT);
        Self {
            page: page.clamp(1, i64::MAX as u64 / limit),
            limit,
        }
    }

    /// Coerce raw `page`/`limit` text. Missing, non-numeric or non-positive
    /// values take the defaults; `limit` is capped at [`MAX_LIMIT`].
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: u64| {
            raw.and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v >= 1)
                .unwrap_or(default)
        };
        Self::new(parse(page, DEFAULT_PAGE), parse(limit, DEFAULT_LIMIT))
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Whether records remain after this page.
    pub fn has_more(&self, total: u64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }
}

/// Store-level filter. All present conditions must hold; `search` matches if
/// any one of title, description or content contains it, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub category: Option<Category>,
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
    pub featured: Option<bool>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        if self.category.is_some_and(|c| c != post.category) {
            return false;
        }
        if self.author_id.is_some_and(|a| a != post.user_id) {
            return false;
        }
        if self.featured.is_some_and(|f| f != post.is_featured) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&post.title, &post.description, &post.content]
                    .into_iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// One page of a post listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<PostWithAuthor>,
    pub has_more: bool,
    pub total_posts: u64,
    pub page: PageRequest,
}

impl PostPage {
    pub fn empty(page: PageRequest) -> Self {
        Self {
            posts: Vec::new(),
            has_more: false,
            total_posts: 0,
            page,
        }
    }
}
