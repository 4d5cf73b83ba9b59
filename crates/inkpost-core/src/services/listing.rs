//! Post listing query builder.

use std::sync::Arc;

use crate::domain::{ListingParams, PostFilter, PostPage};
use crate::error::DomainError;
use crate::ports::{PostRepository, UserRepository};

/// Resolves listing parameters into a store filter and runs the count and
/// page queries.
#[derive(Clone)]
pub struct PostListing {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostListing {
    pub fn new(posts: Arc<dyn PostRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { posts, users }
    }

    /// List one page of posts.
    ///
    /// The total is counted against the filter before pagination, so it does
    /// not depend on `page` or `limit`. An unknown `author` is `NotFound` and
    /// no post query runs.
    pub async fn list(&self, params: &ListingParams) -> Result<PostPage, DomainError> {
        let page = params.page_request();

        let Some(filter) = self.build_filter(params).await? else {
            tracing::debug!(cat = ?params.cat, "Unknown category, returning empty listing");
            return Ok(PostPage::empty(page));
        };
        let sort = params.sort_mode();

        let total_posts = self.posts.count(&filter).await?;
        let posts = self.posts.find_page(&filter, sort, page).await?;

        tracing::debug!(
            total_posts,
            returned = posts.len(),
            page = page.page,
            limit = page.limit,
            ?sort,
            "Listed posts"
        );

        Ok(PostPage {
            posts,
            has_more: page.has_more(total_posts),
            total_posts,
            page,
        })
    }

    /// Build the store filter. `None` means the filter cannot match anything.
    pub async fn build_filter(
        &self,
        params: &ListingParams,
    ) -> Result<Option<PostFilter>, DomainError> {
        let mut filter = PostFilter {
            featured: params.featured(),
            search: params.search().map(str::to_string),
            ..Default::default()
        };

        // Author first: an unknown author is NotFound even when the category
        // already rules every post out.
        if let Some(username) = params.author() {
            let author = self
                .users
                .find_by_username(username)
                .await?
                .ok_or_else(|| DomainError::not_found("author", username))?;
            filter.author_id = Some(author.id);
        }

        match params.category() {
            Some(Some(category)) => filter.category = Some(category),
            Some(None) => return Ok(None),
            None => {}
        }

        Ok(Some(filter))
    }
}
