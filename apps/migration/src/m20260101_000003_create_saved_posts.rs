use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_users::Users;
use super::m20260101_000002_create_posts::Posts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SavedPosts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SavedPosts::UserId).uuid().not_null())
                    .col(ColumnDef::new(SavedPosts::PostId).uuid().not_null())
                    .col(
                        ColumnDef::new(SavedPosts::SavedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // One row per (user, post) makes the saved list a set
                    .primary_key(
                        Index::create()
                            .col(SavedPosts::UserId)
                            .col(SavedPosts::PostId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_posts_user_id")
                            .from(SavedPosts::Table, SavedPosts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_posts_post_id")
                            .from(SavedPosts::Table, SavedPosts::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SavedPosts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SavedPosts {
    Table,
    UserId,
    PostId,
    SavedAt,
}
