use sea_orm::DeriveIden;

/// Pivot between categories and products, keyed by both ids.
#[derive(Copy, Clone, Debug, DeriveIden)]
pub enum Column {
    ProductId,
    CategoryId,
}
