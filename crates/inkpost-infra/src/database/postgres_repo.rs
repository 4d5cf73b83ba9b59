//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use inkpost_core::domain::{
    CommentWithAuthor, PageRequest, Post, PostFilter, PostPatch, PostWithAuthor, SortMode, User,
};
use inkpost_core::error::RepoError;
use inkpost_core::ports::{CommentRepository, PostRepository, UserRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::saved_post::{self, Entity as SavedPostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};
use super::query::{apply_sort, filter_condition};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

fn with_author((post, author): (post::Model, Option<user::Model>)) -> PostWithAuthor {
    PostWithAuthor {
        post: post.into(),
        author: author.map(Into::into),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(%username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn saved_post_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let rows = SavedPostEntity::find()
            .filter(saved_post::Column::UserId.eq(user_id))
            .order_by_asc(saved_post::Column::SavedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(|row| row.post_id).collect())
    }

    async fn add_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        let row = saved_post::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(post_id),
            saved_at: Set(Utc::now().into()),
        };

        SavedPostEntity::insert(row)
            .on_conflict(
                OnConflict::columns([saved_post::Column::UserId, saved_post::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    async fn remove_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        SavedPostEntity::delete_many()
            .filter(saved_post::Column::UserId.eq(user_id))
            .filter(saved_post::Column::PostId.eq(post_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .find_also_related(UserEntity)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(with_author))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let count = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(count > 0)
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(filter_condition(filter))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        tracing::debug!(?filter, ?sort, page = page.page, limit = page.limit, "Fetching post page");

        let rows = apply_sort(PostEntity::find().filter(filter_condition(filter)), sort)
            .find_also_related(UserEntity)
            .offset(page.offset())
            .limit(page.limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(with_author).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        let rows = PostEntity::find()
            .filter(post::Column::Id.is_in(ids.iter().copied()))
            .order_by_desc(post::Column::CreatedAt)
            .find_also_related(UserEntity)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(with_author).collect())
    }

    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        let result = PostEntity::update_many()
            .col_expr(post::Column::Visit, Expr::value(visit))
            .filter(post::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        let mut update = PostEntity::update_many()
            .col_expr(post::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(title) = &patch.title {
            update = update.col_expr(post::Column::Title, Expr::value(title.clone()));
        }
        if let Some(description) = &patch.description {
            update = update.col_expr(post::Column::Description, Expr::value(description.clone()));
        }
        if let Some(category) = patch.category {
            update = update.col_expr(post::Column::Category, Expr::value(category.as_str()));
        }
        if let Some(content) = &patch.content {
            update = update.col_expr(post::Column::Content, Expr::value(content.clone()));
        }
        if let Some(img) = &patch.img {
            update = update.col_expr(post::Column::Img, Expr::value(img.clone()));
        }

        let rows = update
            .filter(post::Column::Id.eq(id))
            .exec_with_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().next().map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        let rows = PostEntity::update_many()
            .col_expr(post::Column::IsFeatured, Expr::value(featured))
            .filter(post::Column::Id.eq(id))
            .exec_with_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().next().map(Into::into).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let rows = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .find_also_related(UserEntity)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(comment, author)| CommentWithAuthor {
                comment: comment.into(),
                author: author.map(Into::into),
            })
            .collect())
    }
}
