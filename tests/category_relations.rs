use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;
use shop_catalog::{
    db::{create_orm_conn, run_migrations},
    dto::products::CreateProductRequest,
    error::AppError,
    factory::CategoryFactory,
    mass_assignment::{CategoryAttributes, NewCategory},
    repository::{CategoryRepository, ProductRepository},
    routes::params::{CategoryQuery, Pagination},
    schema::{CatalogSchema, quote_ident},
    services::category_service,
    state::AppState,
};
use uuid::Uuid;

// Each run works on its own prefixed tables and drops them at the end.
async fn setup() -> anyhow::Result<Option<(DatabaseConnection, CatalogSchema)>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run catalog tests.");
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    let prefix = format!("t{}", &Uuid::new_v4().simple().to_string()[..8]);
    let schema = CatalogSchema::with_prefix(&prefix);
    schema.validate()?;
    run_migrations(&orm, &schema).await?;
    Ok(Some((orm, schema)))
}

async fn teardown(orm: &DatabaseConnection, schema: &CatalogSchema) -> anyhow::Result<()> {
    let tables = [
        &schema.category_products_table,
        &schema.products_table,
        &schema.categories_table,
        &schema.audit_table,
    ]
    .map(|t| quote_ident(t))
    .join(", ");
    orm.execute_unprepared(&format!("DROP TABLE IF EXISTS {tables}"))
        .await?;
    Ok(())
}

fn product(name: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: None,
        price: 10_000,
        stock: 5,
    }
}

#[tokio::test]
async fn parent_children_and_ancestors_follow_parent_id() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let apparel = CategoryFactory::seeded(1).named("Apparel").root().create(&repo).await?;
    let shirts = CategoryFactory::seeded(2)
        .named("Shirts")
        .child_of(apparel.id)
        .create(&repo)
        .await?;
    let tees = CategoryFactory::seeded(3)
        .named("Tees")
        .child_of(shirts.id)
        .create(&repo)
        .await?;
    let hoodies = CategoryFactory::seeded(4)
        .named("Hoodies")
        .child_of(apparel.id)
        .create(&repo)
        .await?;

    assert_eq!(repo.parent(apparel.id).await?, None);
    assert_eq!(repo.parent(tees.id).await?.map(|c| c.id), Some(shirts.id));

    let children: Vec<Uuid> = repo.children(apparel.id).await?.iter().map(|c| c.id).collect();
    assert_eq!(children, vec![hoodies.id, shirts.id]);
    assert!(repo.children(tees.id).await?.is_empty());

    let chain: Vec<Uuid> = repo.ancestors(tees.id).await?.iter().map(|c| c.id).collect();
    assert_eq!(chain, vec![shirts.id, apparel.id]);

    let forest = repo.tree().await?;
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 2);

    let roots = repo
        .list(&CategoryQuery {
            roots_only: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(roots.total, 1);

    let by_parent = repo
        .list(&CategoryQuery {
            parent_id: Some(apparel.id),
            q: Some("SHIR".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(by_parent.items.len(), 1);
    assert_eq!(by_parent.items[0].id, shirts.id);

    // Wildcards in the search text match literally.
    let wildcard = repo
        .list(&CategoryQuery {
            q: Some("%".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(wildcard.total, 0);

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn links_are_visible_from_both_sides() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let categories = CategoryRepository::new(&orm, &schema);
    let products = ProductRepository::new(&orm, &schema);

    let mugs = CategoryFactory::new().named("Mugs").create(&categories).await?;
    let gifts = CategoryFactory::new().named("Gifts").create(&categories).await?;
    let mug = products.create(product("Ferris Mug")).await?;

    assert!(categories.attach_product(mugs.id, mug.id).await?);
    assert!(categories.attach_product(gifts.id, mug.id).await?);
    // Attaching twice keeps a single link.
    assert!(!categories.attach_product(mugs.id, mug.id).await?);

    let page = categories.products(mugs.id, &Pagination::default()).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, mug.id);

    let linked: Vec<Uuid> = products.categories(mug.id).await?.iter().map(|c| c.id).collect();
    assert_eq!(linked, vec![gifts.id, mugs.id]);

    categories.detach_product(gifts.id, mug.id).await?;
    let linked = products.categories(mug.id).await?;
    assert_eq!(linked.len(), 1);
    assert!(matches!(
        categories.detach_product(gifts.id, mug.id).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        categories.attach_product(mugs.id, Uuid::new_v4()).await,
        Err(AppError::NotFound)
    ));

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn mass_assignment_sets_only_supplied_fields() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let parent = CategoryFactory::new().named("Books").create(&repo).await?;
    let input = json!({
        "name": "Programming",
        "parent_id": parent.id.to_string(),
        "id": Uuid::new_v4().to_string(),
        "created_at": "2001-01-01T00:00:00Z",
    });
    let attrs = CategoryAttributes::from_value(&input, &schema.mass_assignment)?;
    assert_eq!(attrs.ignored.len(), 2);

    let created = repo.create(NewCategory::try_from(attrs)?).await?;
    assert_eq!(created.slug, "programming");
    assert_eq!(created.parent_id, Some(parent.id));
    assert_ne!(created.id.to_string(), input["id"].as_str().unwrap_or_default());

    let rename = CategoryAttributes::from_value(&json!({ "name": "Software" }), &schema.mass_assignment)?;
    let renamed = repo.update(created.id, rename).await?;
    assert_eq!(renamed.name, "Software");
    assert_eq!(renamed.slug, "programming");
    assert_eq!(renamed.parent_id, Some(parent.id));
    assert!(renamed.updated_at >= created.updated_at);

    let to_root = CategoryAttributes::from_value(&json!({ "parent_id": null }), &schema.mass_assignment)?;
    let moved = repo.update(created.id, to_root).await?;
    assert_eq!(moved.parent_id, None);
    assert_eq!(moved.name, "Software");

    let taken = CategoryAttributes::from_value(&json!({ "slug": parent.slug }), &schema.mass_assignment)?;
    assert!(matches!(
        repo.update(created.id, taken).await,
        Err(AppError::Conflict(_))
    ));

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn reparenting_cannot_create_a_cycle() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let a = CategoryFactory::new().named("A").create(&repo).await?;
    let b = CategoryFactory::new().named("B").child_of(a.id).create(&repo).await?;
    let c = CategoryFactory::new().named("C").child_of(b.id).create(&repo).await?;

    let under_self = CategoryAttributes {
        parent_id: Some(Some(a.id)),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(a.id, under_self).await,
        Err(AppError::BadRequest(_))
    ));

    let under_grandchild = CategoryAttributes {
        parent_id: Some(Some(c.id)),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(a.id, under_grandchild).await,
        Err(AppError::BadRequest(_))
    ));

    // The rejected move left the row unchanged.
    assert_eq!(repo.get(a.id).await?.parent_id, None);

    let missing_parent = CategoryAttributes {
        parent_id: Some(Some(Uuid::new_v4())),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(c.id, missing_parent).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(repo.get(c.id).await?.parent_id, Some(b.id));

    let orphan = NewCategory {
        parent_id: Some(Uuid::new_v4()),
        slug: "orphan".into(),
        name: "Orphan".into(),
    };
    assert!(matches!(repo.create(orphan).await, Err(AppError::BadRequest(_))));
    assert!(repo.find_by_slug("orphan").await?.is_none());

    // A legal move: C becomes a sibling of B.
    let sibling = CategoryAttributes {
        parent_id: Some(Some(a.id)),
        ..Default::default()
    };
    assert_eq!(repo.update(c.id, sibling).await?.parent_id, Some(a.id));

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn delete_is_restricted_while_referenced() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let categories = CategoryRepository::new(&orm, &schema);
    let products = ProductRepository::new(&orm, &schema);

    let parent = CategoryFactory::new().create(&categories).await?;
    let child = CategoryFactory::new().child_of(parent.id).create(&categories).await?;
    let item = products.create(product("Sticker")).await?;
    categories.attach_product(child.id, item.id).await?;

    assert!(matches!(
        categories.delete(parent.id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        categories.delete(child.id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(products.delete(item.id).await, Err(AppError::Conflict(_))));

    categories.detach_product(child.id, item.id).await?;
    products.delete(item.id).await?;
    categories.delete(child.id).await?;
    categories.delete(parent.id).await?;

    assert!(categories.find(parent.id).await?.is_none());
    assert!(matches!(categories.delete(parent.id).await, Err(AppError::NotFound)));

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn factory_rows_persist_with_valid_relations() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let root = CategoryFactory::new().create(&repo).await?;
    let leaves = CategoryFactory::new()
        .child_of(root.id)
        .create_many(&repo, 5)
        .await?;

    assert_eq!(leaves.len(), 5);
    for leaf in &leaves {
        assert_eq!(repo.parent(leaf.id).await?.map(|p| p.id), Some(root.id));
        assert_eq!(repo.find_by_slug(&leaf.slug).await?.map(|c| c.id), Some(leaf.id));
    }
    assert_eq!(repo.children(root.id).await?.len(), 5);

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn service_mutations_write_audit_rows() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let pool = orm.get_postgres_connection_pool().clone();
    let state = AppState::new(pool, orm.clone(), schema.clone());

    let created = category_service::create_category(
        &state,
        json!({ "name": "Audited", "created_at": "ignored" }),
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("create returned no data"))?;
    assert_eq!(created.slug, "audited");

    category_service::update_category(&state, created.id, json!({ "name": "Audited Again" }))
        .await?;
    // Only guarded keys: nothing changes, nothing is audited.
    category_service::update_category(&state, created.id, json!({ "id": Uuid::new_v4().to_string() }))
        .await?;
    category_service::delete_category(&state, created.id).await?;

    let sql = format!(
        "SELECT action FROM {} ORDER BY created_at, action",
        quote_ident(&schema.audit_table)
    );
    let mut actions: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&state.pool).await?;
    actions.sort();
    assert_eq!(
        actions,
        vec!["category_create", "category_delete", "category_update"]
    );

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn corrupted_cycles_stop_the_ancestor_walk() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let a = CategoryFactory::new().named("A").create(&repo).await?;
    let b = CategoryFactory::new().named("B").child_of(a.id).create(&repo).await?;
    let c = CategoryFactory::new().named("C").create(&repo).await?;

    // Bypass the repository to close the loop A -> B -> A.
    orm.execute_unprepared(&format!(
        "UPDATE {} SET parent_id = '{}' WHERE id = '{}'",
        quote_ident(&schema.categories_table),
        b.id,
        a.id
    ))
    .await?;

    assert!(matches!(repo.ancestors(a.id).await, Err(AppError::Internal(_))));
    assert!(matches!(repo.ancestors(b.id).await, Err(AppError::Internal(_))));

    let into_loop = CategoryAttributes {
        parent_id: Some(Some(a.id)),
        ..Default::default()
    };
    assert!(matches!(
        repo.update(c.id, into_loop).await,
        Err(AppError::Internal(_))
    ));
    assert_eq!(repo.get(c.id).await?.parent_id, None);

    // Break the loop so the tables can be dropped cleanly.
    orm.execute_unprepared(&format!(
        "UPDATE {} SET parent_id = NULL WHERE id = '{}'",
        quote_ident(&schema.categories_table),
        a.id
    ))
    .await?;

    teardown(&orm, &schema).await
}

#[tokio::test]
async fn concurrent_opposite_moves_cannot_both_succeed() -> anyhow::Result<()> {
    let Some((orm, schema)) = setup().await? else {
        return Ok(());
    };
    let repo = CategoryRepository::new(&orm, &schema);

    let a = CategoryFactory::new().named("A").create(&repo).await?;
    let b = CategoryFactory::new().named("B").create(&repo).await?;

    let a_under_b = CategoryAttributes {
        parent_id: Some(Some(b.id)),
        ..Default::default()
    };
    let b_under_a = CategoryAttributes {
        parent_id: Some(Some(a.id)),
        ..Default::default()
    };
    let (first, second) = tokio::join!(repo.update(a.id, a_under_b), repo.update(b.id, b_under_a));

    let succeeded = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    for result in [first, second] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
        }
    }

    let a_now = repo.get(a.id).await?;
    let b_now = repo.get(b.id).await?;
    assert!(
        !(a_now.parent_id == Some(b.id) && b_now.parent_id == Some(a.id)),
        "both moves were applied"
    );

    teardown(&orm, &schema).await
}
