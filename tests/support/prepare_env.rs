use codeshop_engine::{
    db_types::{NewProduct, Product, UsdAmount},
    CatalogApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

/// Creates a fresh database at `url`, runs the migrations and returns a handle to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/codeshop_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Adds a product to the catalog and stocks it with the given codes.
pub async fn seed_product(db: &SqliteDatabase, slug: &str, price_cents: i64, codes: &[&str]) -> Product {
    let title = format!("{} STOCK", slug.to_uppercase());
    let product = db
        .insert_product(NewProduct::new(slug, title.as_str(), "Gaming", UsdAmount::from_cents(price_cents)))
        .await
        .expect("Error seeding product");
    if !codes.is_empty() {
        let batch: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        CatalogApi::new(db.clone()).add_codes(slug, &batch).await.expect("Error seeding codes");
    }
    product
}
