//! Post, user and comment services driven over the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

use inkpost_core::domain::{
    Category, ListingParams, PageRequest, Post, PostDraft, PostFilter, PostPatch, PostWithAuthor,
    SortMode, User,
};
use inkpost_core::error::RepoError;
use inkpost_core::ports::{BaseRepository, PostRepository, SessionClaims, UserRepository};
use inkpost_core::services::{
    CommentService, MAX_INSERT_ATTEMPTS, PostService, RESERVED_SLUGS, SlugAllocator, UserService,
};
use inkpost_core::{DomainError, RequestContext, Role};
use inkpost_infra::InMemoryDatabase;

struct Fixture {
    db: Arc<InMemoryDatabase>,
    posts: PostService,
    users: UserService,
    comments: CommentService,
}

impl Fixture {
    fn new() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        Self {
            posts: PostService::new(db.clone(), db.clone()),
            users: UserService::new(db.clone(), db.clone()),
            comments: CommentService::new(db.clone(), db.clone(), db.clone()),
            db,
        }
    }

    /// Provision a user and return their request context.
    async fn signed_in(&self, external_id: &str, username: &str) -> RequestContext {
        let ctx = RequestContext::authenticated(SessionClaims::new(external_id).with_username(username));
        self.users.provision(&ctx).await.unwrap();
        ctx
    }

    fn admin(&self) -> RequestContext {
        RequestContext::authenticated(SessionClaims::new("admin_1").with_role(Role::Admin))
    }

    async fn write(&self, ctx: &RequestContext, title: &str) -> Post {
        self.posts.create(ctx, draft(title)).await.unwrap()
    }
}

fn draft(title: &str) -> PostDraft {
    PostDraft {
        title: title.to_string(),
        description: format!("About {title}"),
        category: Category::General,
        content: "<p>Body text</p>".to_string(),
        img: None,
    }
}

fn params() -> ListingParams {
    ListingParams::default()
}

#[tokio::test]
async fn test_slugs_get_incrementing_suffixes() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;

    let first = fx.write(&ctx, "Hello World").await;
    let second = fx.write(&ctx, "Hello World").await;
    let third = fx.write(&ctx, "Hello World").await;

    assert_eq!(first.slug, "hello-world");
    assert_eq!(second.slug, "hello-world-2");
    assert_eq!(third.slug, "hello-world-3");
}

#[tokio::test]
async fn test_blank_title_is_a_validation_error() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;

    let err = fx.posts.create(&ctx, draft("   ")).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_create_requires_a_provisioned_user() {
    let fx = Fixture::new();

    let anonymous = fx.posts.create(&RequestContext::anonymous(), draft("Hi")).await;
    assert!(matches!(anonymous, Err(DomainError::Unauthenticated)));

    let stranger = RequestContext::authenticated(SessionClaims::new("user_unknown"));
    let err = fx.posts.create(&stranger, draft("Hi")).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "user", .. }));
}

/// Wraps the store and makes the first `slug_exists` check lie, as if a
/// concurrent writer inserted between the check and the insert.
struct RacingPosts {
    inner: Arc<InMemoryDatabase>,
    stale_checks: AtomicUsize,
}

#[async_trait]
impl BaseRepository<Post, Uuid> for RacingPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        BaseRepository::<Post, Uuid>::find_by_id(self.inner.as_ref(), id).await
    }
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        BaseRepository::<Post, Uuid>::insert(self.inner.as_ref(), post).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<Post, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl PostRepository for RacingPosts {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        self.inner.find_by_slug(slug).await
    }
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        if self.stale_checks.load(Ordering::SeqCst) > 0 {
            self.stale_checks.fetch_sub(1, Ordering::SeqCst);
            return Ok(false);
        }
        self.inner.slug_exists(slug).await
    }
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.inner.count(filter).await
    }
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_page(filter, sort, page).await
    }
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_by_ids(ids).await
    }
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        self.inner.set_visit(id, visit).await
    }
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        self.inner.update_content(id, patch).await
    }
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        self.inner.set_featured(id, featured).await
    }
}

#[tokio::test]
async fn test_insert_conflict_retries_with_next_candidate() {
    let db = Arc::new(InMemoryDatabase::new());
    let owner = Uuid::new_v4();
    BaseRepository::<Post, Uuid>::insert(
        db.as_ref(),
        Post::new(owner, "hello-world".to_string(), draft("Hello World")),
    )
    .await
    .unwrap();

    let racing = Arc::new(RacingPosts {
        inner: db.clone(),
        stale_checks: AtomicUsize::new(1),
    });
    let allocator = SlugAllocator::new(racing);

    let post = allocator
        .insert_with_unique_slug("Hello World", |slug| Post::new(owner, slug, draft("Hello World")))
        .await
        .unwrap();

    assert_eq!(post.slug, "hello-world-2");
}

/// Reports every slug as free and fails every insert with `failure`.
struct RejectingPosts {
    inner: Arc<InMemoryDatabase>,
    failure: fn() -> RepoError,
    inserts: AtomicUsize,
}

impl RejectingPosts {
    fn new(failure: fn() -> RepoError) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(InMemoryDatabase::new()),
            failure,
            inserts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for RejectingPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        BaseRepository::<Post, Uuid>::find_by_id(self.inner.as_ref(), id).await
    }
    async fn insert(&self, _post: Post) -> Result<Post, RepoError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Err((self.failure)())
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<Post, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl PostRepository for RejectingPosts {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        self.inner.find_by_slug(slug).await
    }
    async fn slug_exists(&self, _slug: &str) -> Result<bool, RepoError> {
        Ok(false)
    }
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.inner.count(filter).await
    }
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_page(filter, sort, page).await
    }
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_by_ids(ids).await
    }
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        self.inner.set_visit(id, visit).await
    }
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        self.inner.update_content(id, patch).await
    }
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        self.inner.set_featured(id, featured).await
    }
}

#[tokio::test]
async fn test_slug_allocation_gives_up_after_max_attempts() {
    let rejecting = RejectingPosts::new(|| RepoError::Constraint("posts_slug_key".to_string()));
    let allocator = SlugAllocator::new(rejecting.clone());
    let owner = Uuid::new_v4();

    let err = allocator
        .insert_with_unique_slug("Hello World", |slug| Post::new(owner, slug, draft("Hello World")))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Conflict(_)));
    assert_eq!(
        rejecting.inserts.load(Ordering::SeqCst),
        MAX_INSERT_ATTEMPTS as usize
    );
}

#[tokio::test]
async fn test_store_failure_during_insert_is_not_retried() {
    let rejecting = RejectingPosts::new(|| RepoError::Query("connection reset".to_string()));
    let allocator = SlugAllocator::new(rejecting.clone());
    let owner = Uuid::new_v4();

    let err = allocator
        .insert_with_unique_slug("Hello World", |slug| Post::new(owner, slug, draft("Hello World")))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Infrastructure(_)));
    assert_eq!(rejecting.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reserved_route_segments_are_never_slugs() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;

    for reserved in RESERVED_SLUGS {
        let post = fx.write(&ctx, reserved).await;
        assert_eq!(post.slug, format!("{reserved}-2"));
    }

    let post = fx.write(&ctx, "Upload Auth").await;
    assert_eq!(post.slug, "upload-auth-3");

    let post = fx.write(&ctx, "Client/Server").await;
    assert_eq!(post.slug, "client-server");
    assert_eq!(fx.posts.view("client-server").await.unwrap().post.id, post.id);
}

#[tokio::test]
async fn test_total_is_independent_of_pagination() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    for i in 0..25 {
        fx.write(&ctx, &format!("Post {i}")).await;
    }

    for (page, limit) in [("1", "10"), ("3", "10"), ("2", "7"), ("9", "50")] {
        let listing = fx
            .posts
            .list(&ListingParams {
                page: Some(page.to_string()),
                limit: Some(limit.to_string()),
                ..params()
            })
            .await
            .unwrap();
        assert_eq!(listing.total_posts, 25, "page={page} limit={limit}");
    }
}

#[tokio::test]
async fn test_has_more_tracks_last_page() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    for i in 0..21 {
        fx.write(&ctx, &format!("Post {i}")).await;
    }

    let page = |n: &str| ListingParams {
        page: Some(n.to_string()),
        ..params()
    };

    let first = fx.posts.list(&page("1")).await.unwrap();
    assert!(first.has_more);
    assert_eq!(first.posts.len(), 10);

    let last = fx.posts.list(&page("3")).await.unwrap();
    assert!(!last.has_more);
    assert_eq!(last.posts.len(), 1);

    let beyond = fx.posts.list(&page("4")).await.unwrap();
    assert!(!beyond.has_more);
    assert!(beyond.posts.is_empty());

    let empty = Fixture::new().posts.list(&params()).await.unwrap();
    assert!(!empty.has_more);
    assert_eq!(empty.total_posts, 0);
}

#[tokio::test]
async fn test_malformed_paging_uses_defaults() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    for i in 0..12 {
        fx.write(&ctx, &format!("Post {i}")).await;
    }

    let listing = fx
        .posts
        .list(&ListingParams {
            page: Some("first".to_string()),
            limit: Some("lots".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(listing.page, PageRequest::new(1, 10));
    assert_eq!(listing.posts.len(), 10);
    assert!(listing.has_more);
}

#[tokio::test]
async fn test_category_filter_is_exact() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    for (title, category) in [
        ("Flexbox", Category::WebDesign),
        ("Indexes", Category::Databases),
        ("Joins", Category::Databases),
    ] {
        fx.posts
            .create(&ctx, PostDraft { category, ..draft(title) })
            .await
            .unwrap();
    }

    let listing = fx
        .posts
        .list(&ListingParams {
            cat: Some("databases".to_string()),
            ..params()
        })
        .await
        .unwrap();
    assert_eq!(listing.total_posts, 2);
    assert!(listing.posts.iter().all(|p| p.post.category == Category::Databases));

    let partial = fx
        .posts
        .list(&ListingParams {
            cat: Some("data".to_string()),
            ..params()
        })
        .await
        .unwrap();
    assert_eq!(partial.total_posts, 0);
    assert!(partial.posts.is_empty());
}

#[tokio::test]
async fn test_search_matches_any_field_case_insensitively() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    fx.posts
        .create(
            &ctx,
            PostDraft {
                content: "Deep dive into ABC notation".to_string(),
                ..draft("Music")
            },
        )
        .await
        .unwrap();
    fx.posts
        .create(
            &ctx,
            PostDraft {
                description: "learning abc".to_string(),
                ..draft("Basics")
            },
        )
        .await
        .unwrap();
    fx.write(&ctx, "Unrelated").await;

    let listing = fx
        .posts
        .list(&ListingParams {
            search: Some("abc".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(listing.total_posts, 2);
    let titles: Vec<_> = listing.posts.iter().map(|p| p.post.title.as_str()).collect();
    assert!(titles.contains(&"Music"));
    assert!(titles.contains(&"Basics"));
}

#[tokio::test]
async fn test_search_is_and_combined_with_category() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    fx.posts
        .create(&ctx, PostDraft { category: Category::Seo, ..draft("Rust for SEO") })
        .await
        .unwrap();
    fx.posts
        .create(&ctx, PostDraft { category: Category::Development, ..draft("Rust for servers") })
        .await
        .unwrap();

    let listing = fx
        .posts
        .list(&ListingParams {
            search: Some("rust".to_string()),
            cat: Some("seo".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(listing.total_posts, 1);
    assert_eq!(listing.posts[0].post.title, "Rust for SEO");
}

#[tokio::test]
async fn test_author_filter_and_owner_fields() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let bob = fx.signed_in("user_b", "bob").await;
    fx.write(&alice, "Alice one").await;
    fx.write(&alice, "Alice two").await;
    fx.write(&bob, "Bob one").await;

    let listing = fx
        .posts
        .list(&ListingParams {
            author: Some("alice".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(listing.total_posts, 2);
    assert!(
        listing
            .posts
            .iter()
            .all(|p| p.author.as_ref().map(|a| a.username.as_str()) == Some("alice"))
    );
}

/// Counts post-store reads so tests can assert none happened.
struct CountingPosts {
    inner: Arc<InMemoryDatabase>,
    reads: AtomicUsize,
}

#[async_trait]
impl BaseRepository<Post, Uuid> for CountingPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        BaseRepository::<Post, Uuid>::find_by_id(self.inner.as_ref(), id).await
    }
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        BaseRepository::<Post, Uuid>::insert(self.inner.as_ref(), post).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<Post, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl PostRepository for CountingPosts {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_slug(slug).await
    }
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.slug_exists(slug).await
    }
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count(filter).await
    }
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_page(filter, sort, page).await
    }
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_ids(ids).await
    }
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        self.inner.set_visit(id, visit).await
    }
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        self.inner.update_content(id, patch).await
    }
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        self.inner.set_featured(id, featured).await
    }
}

#[tokio::test]
async fn test_unknown_author_is_not_found_without_post_queries() {
    let db = Arc::new(InMemoryDatabase::new());
    let counting = Arc::new(CountingPosts {
        inner: db.clone(),
        reads: AtomicUsize::new(0),
    });
    let service = PostService::new(counting.clone(), db.clone());

    let err = service
        .list(&ListingParams {
            author: Some("alice".to_string()),
            ..params()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::NotFound { entity: "author", .. }));
    assert_eq!(counting.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_author_wins_over_unknown_category() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    fx.write(&ctx, "Anything").await;

    let err = fx
        .posts
        .list(&ListingParams {
            author: Some("nobody".to_string()),
            cat: Some("cooking".to_string()),
            ..params()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "author", .. }));

    let known_author = fx
        .posts
        .list(&ListingParams {
            author: Some("alice".to_string()),
            cat: Some("cooking".to_string()),
            ..params()
        })
        .await
        .unwrap();
    assert_eq!(known_author.total_posts, 0);
}

#[tokio::test]
async fn test_featured_filter() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let star = fx.write(&ctx, "Star").await;
    fx.write(&ctx, "Plain").await;
    fx.posts.toggle_feature(&fx.admin(), star.id).await.unwrap();

    let listing = fx
        .posts
        .list(&ListingParams {
            featured: Some("true".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(listing.total_posts, 1);
    assert_eq!(listing.posts[0].post.id, star.id);
}

async fn seed(db: &InMemoryDatabase, owner: Uuid, title: &str, visit: i64, age_hours: i64) -> Post {
    let mut post = Post::new(owner, title.to_lowercase(), draft(title));
    post.visit = visit;
    post.created_at = Utc::now() - Duration::hours(age_hours);
    BaseRepository::<Post, Uuid>::insert(db, post).await.unwrap()
}

#[tokio::test]
async fn test_sort_modes() {
    let fx = Fixture::new();
    let owner = Uuid::new_v4();
    let old_hot = seed(&fx.db, owner, "old-hot", 50, 72).await;
    let new_warm = seed(&fx.db, owner, "new-warm", 10, 1).await;
    let mid_warm = seed(&fx.db, owner, "mid-warm", 10, 24).await;
    let newest_cold = seed(&fx.db, owner, "newest-cold", 0, 0).await;

    let order = |sort: &str| {
        let posts = fx.posts.clone();
        let sort = sort.to_string();
        async move {
            posts
                .list(&ListingParams {
                    sort: Some(sort),
                    ..params()
                })
                .await
                .unwrap()
                .posts
                .into_iter()
                .map(|p| p.post.id)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        order("trending").await,
        vec![old_hot.id, new_warm.id, mid_warm.id, newest_cold.id]
    );
    assert_eq!(
        order("oldest").await,
        vec![old_hot.id, mid_warm.id, new_warm.id, newest_cold.id]
    );
    assert_eq!(
        order("newest").await,
        vec![newest_cold.id, new_warm.id, mid_warm.id, old_hot.id]
    );
    assert_eq!(order("bogus").await, order("newest").await);
    assert_eq!(order("popular").await[0], old_hot.id);
}

#[tokio::test]
async fn test_view_counts_visits() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&ctx, "Counted").await;

    fx.posts.view(&post.slug).await.unwrap();
    let viewed = fx.posts.view(&post.slug).await.unwrap();

    assert_eq!(viewed.post.visit, 2);
    assert_eq!(viewed.author.unwrap().username, "alice");

    let missing = fx.posts.view("no-such-post").await.unwrap_err();
    assert!(matches!(missing, DomainError::NotFound { entity: "post", .. }));
}

/// Holds every `find_by_slug` caller at a barrier after its read, so
/// concurrent views all read before any of them writes.
struct GatedPosts {
    inner: Arc<InMemoryDatabase>,
    after_read: Barrier,
}

#[async_trait]
impl BaseRepository<Post, Uuid> for GatedPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        BaseRepository::<Post, Uuid>::find_by_id(self.inner.as_ref(), id).await
    }
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        BaseRepository::<Post, Uuid>::insert(self.inner.as_ref(), post).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<Post, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl PostRepository for GatedPosts {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        let found = self.inner.find_by_slug(slug).await;
        self.after_read.wait().await;
        found
    }
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        self.inner.slug_exists(slug).await
    }
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.inner.count(filter).await
    }
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_page(filter, sort, page).await
    }
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_by_ids(ids).await
    }
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        self.inner.set_visit(id, visit).await
    }
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        self.inner.update_content(id, patch).await
    }
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        self.inner.set_featured(id, featured).await
    }
}

/// The visit counter is read-modify-write: two views that read the same
/// count before either writes lose one increment. Accepted for a
/// best-effort counter.
#[tokio::test]
async fn test_interleaved_views_can_lose_a_visit() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&ctx, "Racy").await;

    let gated = Arc::new(GatedPosts {
        inner: fx.db.clone(),
        after_read: Barrier::new(2),
    });
    let service = PostService::new(gated, fx.db.clone());

    let (first, second) = tokio::join!(service.view(&post.slug), service.view(&post.slug));
    assert_eq!(first.unwrap().post.visit, 1);
    assert_eq!(second.unwrap().post.visit, 1);

    let stored = fx.db.find_by_slug(&post.slug).await.unwrap().unwrap().post;
    assert_eq!(stored.visit, 1);
}

/// Commits a competing owner edit and a page view right after the service
/// reads a post by id, before the service writes.
struct InterleavedPosts {
    inner: Arc<InMemoryDatabase>,
    competing_edit: Mutex<Option<PostPatch>>,
}

impl InterleavedPosts {
    fn new(inner: Arc<InMemoryDatabase>, edit: PostPatch) -> Arc<Self> {
        Arc::new(Self {
            inner,
            competing_edit: Mutex::new(Some(edit)),
        })
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InterleavedPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let found = BaseRepository::<Post, Uuid>::find_by_id(self.inner.as_ref(), id).await?;
        let edit = self.competing_edit.lock().unwrap().take();
        if let (Some(post), Some(edit)) = (&found, edit) {
            self.inner.update_content(id, &edit).await?;
            self.inner.set_visit(id, post.visit + 1).await?;
        }
        Ok(found)
    }
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        BaseRepository::<Post, Uuid>::insert(self.inner.as_ref(), post).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<Post, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl PostRepository for InterleavedPosts {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        self.inner.find_by_slug(slug).await
    }
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        self.inner.slug_exists(slug).await
    }
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.inner.count(filter).await
    }
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_page(filter, sort, page).await
    }
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.inner.find_by_ids(ids).await
    }
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        self.inner.set_visit(id, visit).await
    }
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        self.inner.update_content(id, patch).await
    }
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        self.inner.set_featured(id, featured).await
    }
}

fn retitle(title: &str) -> PostPatch {
    PostPatch {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_feature_toggle_keeps_concurrent_edit_and_visits() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&ctx, "Original").await;

    let interleaved = InterleavedPosts::new(fx.db.clone(), retitle("Edited meanwhile"));
    let service = PostService::new(interleaved, fx.db.clone());

    let featured = service.toggle_feature(&fx.admin(), post.id).await.unwrap();
    assert!(featured.is_featured);
    assert_eq!(featured.title, "Edited meanwhile");
    assert_eq!(featured.visit, 1);

    let stored = BaseRepository::<Post, Uuid>::find_by_id(fx.db.as_ref(), post.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Edited meanwhile");
    assert_eq!(stored.visit, 1);
    assert!(stored.is_featured);
}

#[tokio::test]
async fn test_update_keeps_fields_it_does_not_patch() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&ctx, "Original").await;

    let interleaved = InterleavedPosts::new(fx.db.clone(), retitle("Edited meanwhile"));
    let service = PostService::new(interleaved, fx.db.clone());

    let moderated = service
        .update(
            &fx.admin(),
            post.id,
            PostPatch {
                description: Some("Moderated".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moderated.description, "Moderated");
    assert_eq!(moderated.title, "Edited meanwhile");
    assert_eq!(moderated.visit, 1);
}

#[tokio::test]
async fn test_owner_and_admin_can_update() {
    let fx = Fixture::new();
    let ctx = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&ctx, "Draft title").await;

    let updated = fx
        .posts
        .update(
            &ctx,
            post.id,
            PostPatch {
                title: Some("Final title".to_string()),
                category: Some(Category::Marketing),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Final title");
    assert_eq!(updated.category, Category::Marketing);
    assert_eq!(updated.slug, "draft-title");
    assert_eq!(updated.user_id, post.user_id);
    assert_eq!(updated.created_at, post.created_at);

    let by_admin = fx
        .posts
        .update(
            &fx.admin(),
            post.id,
            PostPatch {
                description: Some("Moderated".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_admin.description, "Moderated");
}

#[tokio::test]
async fn test_non_owner_cannot_update_or_delete() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let mallory = fx.signed_in("user_m", "mallory").await;
    let post = fx.write(&alice, "Mine").await;

    let update = fx
        .posts
        .update(
            &mallory,
            post.id,
            PostPatch {
                title: Some("Defaced".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(DomainError::Forbidden(_))));

    let delete = fx.posts.delete(&mallory, post.id).await;
    assert!(matches!(delete, Err(DomainError::Forbidden(_))));

    let stored = BaseRepository::<Post, Uuid>::find_by_id(fx.db.as_ref(), post.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Mine");
    assert_eq!(stored.updated_at, post.updated_at);
}

#[tokio::test]
async fn test_delete_by_owner_and_admin() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let own = fx.write(&alice, "Own").await;
    let other = fx.write(&alice, "Other").await;

    fx.posts.delete(&alice, own.id).await.unwrap();
    fx.posts.delete(&fx.admin(), other.id).await.unwrap();

    assert_eq!(fx.posts.list(&params()).await.unwrap().total_posts, 0);

    let again = fx.posts.delete(&alice, own.id).await;
    assert!(matches!(again, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_feature_toggle_is_admin_only() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&alice, "Feature me").await;

    let denied = fx.posts.toggle_feature(&alice, post.id).await;
    assert!(matches!(denied, Err(DomainError::Forbidden(_))));

    let on = fx.posts.toggle_feature(&fx.admin(), post.id).await.unwrap();
    assert!(on.is_featured);
    let off = fx.posts.toggle_feature(&fx.admin(), post.id).await.unwrap();
    assert!(!off.is_featured);

    let missing = fx.posts.toggle_feature(&fx.admin(), Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_save_toggle_round_trips() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let kept = fx.write(&alice, "Kept").await;
    let toggled = fx.write(&alice, "Toggled").await;

    fx.users.toggle_saved(&alice, kept.id).await.unwrap();
    let before = fx.users.saved_post_ids(&alice).await.unwrap();

    let saved = fx.users.toggle_saved(&alice, toggled.id).await.unwrap();
    assert!(saved.saved);
    assert_eq!(
        fx.users.saved_post_ids(&alice).await.unwrap(),
        vec![kept.id, toggled.id]
    );

    let unsaved = fx.users.toggle_saved(&alice, toggled.id).await.unwrap();
    assert!(!unsaved.saved);
    assert_eq!(fx.users.saved_post_ids(&alice).await.unwrap(), before);
}

#[tokio::test]
async fn test_saving_a_missing_post_is_not_found() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;

    let err = fx.users.toggle_saved(&alice, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "post", .. }));
    assert!(fx.users.saved_post_ids(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_saved_details_resolve_newest_first() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let owner = Uuid::new_v4();
    let older = seed(&fx.db, owner, "older", 0, 10).await;
    let newer = seed(&fx.db, owner, "newer", 0, 1).await;

    assert!(fx.users.saved_posts(&alice).await.unwrap().is_empty());

    fx.users.toggle_saved(&alice, older.id).await.unwrap();
    fx.users.toggle_saved(&alice, newer.id).await.unwrap();

    let details: Vec<_> = fx
        .users
        .saved_posts(&alice)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.post.id)
        .collect();
    assert_eq!(details, vec![newer.id, older.id]);
}

#[tokio::test]
async fn test_provision_is_idempotent() {
    let fx = Fixture::new();
    let ctx = RequestContext::authenticated(SessionClaims::new("user_2xYz9").with_username("carol"));

    let first = fx.users.provision(&ctx).await.unwrap();
    let second = fx.users.provision(&ctx).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.username, "carol");

    let nameless = RequestContext::authenticated(SessionClaims::new("user_2QRS77ab"));
    let user = fx.users.provision(&nameless).await.unwrap();
    assert_eq!(user.username, "user-user2qrs");
}

#[tokio::test]
async fn test_provision_rejects_taken_username() {
    let fx = Fixture::new();
    fx.signed_in("user_a", "alice").await;

    let imposter = RequestContext::authenticated(SessionClaims::new("user_z").with_username("alice"));
    let err = fx.users.provision(&imposter).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let user = fx.db.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(user.external_id, "user_a");
}

/// Holds every `saved_post_ids` caller at a barrier after its read.
struct GatedUsers {
    inner: Arc<InMemoryDatabase>,
    after_read: Barrier,
}

#[async_trait]
impl BaseRepository<User, Uuid> for GatedUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        BaseRepository::<User, Uuid>::find_by_id(self.inner.as_ref(), id).await
    }
    async fn insert(&self, user: User) -> Result<User, RepoError> {
        BaseRepository::<User, Uuid>::insert(self.inner.as_ref(), user).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<User, Uuid>::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl UserRepository for GatedUsers {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, RepoError> {
        self.inner.find_by_external_id(external_id).await
    }
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.inner.find_by_username(username).await
    }
    async fn saved_post_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let ids = self.inner.saved_post_ids(user_id).await;
        self.after_read.wait().await;
        ids
    }
    async fn add_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        self.inner.add_saved_post(user_id, post_id).await
    }
    async fn remove_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        self.inner.remove_saved_post(user_id, post_id).await
    }
}

/// Two toggles that both read the saved set before either writes both
/// decide to save: the pair leaves the post saved instead of unsaved.
#[tokio::test]
async fn test_interleaved_save_toggles_can_lose_an_update() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&alice, "Bookmarked").await;

    let gated = Arc::new(GatedUsers {
        inner: fx.db.clone(),
        after_read: Barrier::new(2),
    });
    let users = UserService::new(gated, fx.db.clone());

    let (first, second) = tokio::join!(
        users.toggle_saved(&alice, post.id),
        users.toggle_saved(&alice, post.id)
    );
    assert!(first.unwrap().saved);
    assert!(second.unwrap().saved);

    assert_eq!(fx.users.saved_post_ids(&alice).await.unwrap(), vec![post.id]);
}

#[tokio::test]
async fn test_comments_list_newest_first_with_writers() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let bob = fx.signed_in("user_b", "bob").await;
    let post = fx.write(&alice, "Discussed").await;

    let first = fx.comments.add(&bob, post.id, "First".to_string()).await.unwrap();
    let second = fx.comments.add(&alice, post.id, "Second".to_string()).await.unwrap();
    assert_eq!(first.author.as_ref().unwrap().username, "bob");

    let listed = fx.comments.list(post.id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|c| c.comment.id).collect();
    assert_eq!(ids, vec![second.comment.id, first.comment.id]);
    assert_eq!(listed[1].author.as_ref().unwrap().username, "bob");

    assert!(fx.comments.list(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_adding_a_comment_needs_a_user_a_post_and_text() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let post = fx.write(&alice, "Target").await;

    let anonymous = fx
        .comments
        .add(&RequestContext::anonymous(), post.id, "Hi".to_string())
        .await;
    assert!(matches!(anonymous, Err(DomainError::Unauthenticated)));

    let blank = fx.comments.add(&alice, post.id, "  ".to_string()).await;
    assert!(matches!(blank, Err(DomainError::Validation(_))));

    let missing = fx.comments.add(&alice, Uuid::new_v4(), "Hi".to_string()).await;
    assert!(matches!(missing, Err(DomainError::NotFound { entity: "post", .. })));

    assert!(fx.comments.list(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_delete_by_writer_or_admin_only() {
    let fx = Fixture::new();
    let alice = fx.signed_in("user_a", "alice").await;
    let bob = fx.signed_in("user_b", "bob").await;
    let post = fx.write(&alice, "Moderated").await;
    let by_bob = fx.comments.add(&bob, post.id, "Mine".to_string()).await.unwrap();
    let by_alice = fx.comments.add(&alice, post.id, "Reply".to_string()).await.unwrap();

    let denied = fx.comments.delete(&alice, by_bob.comment.id).await;
    assert!(matches!(denied, Err(DomainError::Forbidden(_))));

    fx.comments.delete(&bob, by_bob.comment.id).await.unwrap();
    fx.comments.delete(&fx.admin(), by_alice.comment.id).await.unwrap();
    assert!(fx.comments.list(post.id).await.unwrap().is_empty());

    let again = fx.comments.delete(&bob, by_bob.comment.id).await;
    assert!(matches!(again, Err(DomainError::NotFound { entity: "comment", .. })));
}
