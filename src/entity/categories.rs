use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DeriveIden, FromQueryResult};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct Model {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, DeriveIden)]
pub enum Column {
    Id,
    ParentId,
    Slug,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::ParentId,
        Column::Slug,
        Column::Name,
        Column::CreatedAt,
        Column::UpdatedAt,
    ];
}
