use shop_catalog::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::products::CreateProductRequest,
    factory::CategoryFactory,
    models::Category,
    repository::{CategoryRepository, ProductRepository},
    routes::params::Pagination,
};
use uuid::Uuid;

// (name, slug, parent slug)
const CATEGORIES: [(&str, &str, Option<&str>); 7] = [
    ("Apparel", "apparel", None),
    ("Shirts", "shirts", Some("apparel")),
    ("Hoodies", "hoodies", Some("apparel")),
    ("Books", "books", None),
    ("Programming", "programming", Some("books")),
    ("Home", "home", None),
    ("Mugs", "mugs", Some("home")),
];

// (name, price, stock, category slug)
const PRODUCTS: [(&str, i64, i32, &str); 4] = [
    ("Ferris Tee", 250_000, 40, "shirts"),
    ("Crab Hoodie", 450_000, 15, "hoodies"),
    ("The Rust Book", 380_000, 25, "programming"),
    ("Borrow Checker Mug", 120_000, 60, "mugs"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm, &config.schema).await?;

    let categories = CategoryRepository::new(&orm, &config.schema);
    let products = ProductRepository::new(&orm, &config.schema);

    let mut created = 0;
    for (name, slug, parent) in CATEGORIES {
        if categories.find_by_slug(slug).await?.is_some() {
            continue;
        }
        let parent_id = match parent {
            Some(parent_slug) => Some(ensure_category_id(&categories, parent_slug).await?),
            None => None,
        };
        let mut builder = CategoryFactory::seeded(2024).named(name).with("slug", slug);
        builder = match parent_id {
            Some(id) => builder.child_of(id),
            None => builder.root(),
        };
        builder.create(&categories).await?;
        created += 1;
    }

    // A few generated leaves to exercise pagination.
    let mugs = ensure_category_id(&categories, "mugs").await?;
    let existing_children = categories.children(mugs).await?.len();
    if existing_children < 3 {
        CategoryFactory::new()
            .child_of(mugs)
            .create_many(&categories, 3 - existing_children)
            .await?;
    }

    let existing_products = products.list(&Pagination::new(1, 1)).await?.total;
    if existing_products == 0 {
        for (name, price, stock, slug) in PRODUCTS {
            let product = products
                .create(CreateProductRequest {
                    name: name.to_string(),
                    description: Some(format!("{name} from the seed catalog")),
                    price,
                    stock,
                })
                .await?;
            let category_id = ensure_category_id(&categories, slug).await?;
            categories.attach_product(category_id, product.id).await?;
        }
    }

    println!("Seed completed. Categories created: {created}, products existing before: {existing_products}");
    Ok(())
}

async fn ensure_category_id(
    repo: &CategoryRepository<'_, sea_orm::DatabaseConnection>,
    slug: &str,
) -> anyhow::Result<Uuid> {
    let category: Option<Category> = repo.find_by_slug(slug).await?;
    category
        .map(|c| c.id)
        .ok_or_else(|| anyhow::anyhow!("category `{slug}` is missing"))
}
