use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DeriveIden, FromQueryResult};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct Model {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, DeriveIden)]
pub enum Column {
    Id,
    Name,
    Description,
    Price,
    Stock,
    CreatedAt,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::Name,
        Column::Description,
        Column::Price,
        Column::Stock,
        Column::CreatedAt,
    ];
}
