use marketplace_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    middleware::auth::issue_token,
    models::UserRole,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(pool.clone())).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", UserRole::Admin).await?;
    let buyer_id = ensure_user(&pool, "Asha Buyer", "buyer@example.com", UserRole::Buyer).await?;
    let partner_id =
        ensure_user(&pool, "Ravi Rider", "rider@example.com", UserRole::Delivery).await?;
    let seller_user_id =
        ensure_user(&pool, "Meera Seller", "seller@example.com", UserRole::Seller).await?;
    let seller_id = ensure_seller(&pool, seller_user_id, "Meera's Pantry", 10).await?;
    seed_products(&pool, seller_id).await?;

    let ttl = chrono::Duration::days(7);
    for (label, id, role) in [
        ("admin", admin_id, UserRole::Admin),
        ("buyer", buyer_id, UserRole::Buyer),
        ("seller", seller_user_id, UserRole::Seller),
        ("delivery", partner_id, UserRole::Delivery),
    ] {
        let token = issue_token(&config.jwt_secret, id, role, ttl)?;
        println!("{label:<9} id={id} token={token}");
    }
    println!("Seed completed. Seller ID: {seller_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(role.to_string())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn ensure_seller(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    store_name: &str,
    commission_percent: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO sellers (id, user_id, store_name, approved, kyc_status, commission_percent)
        VALUES ($1, $2, $3, TRUE, 'approved', $4)
        ON CONFLICT (user_id) DO UPDATE SET approved = TRUE, kyc_status = 'approved'
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(store_name)
    .bind(commission_percent)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT count(*) FROM products WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Products already seeded");
        return Ok(());
    }

    let products = [
        ("Basmati Rice 5kg", 65000, 40),
        ("Cold Pressed Groundnut Oil 1L", 28000, 60),
        ("Masala Chai 250g", 18000, 120),
        ("Jaggery Powder 1kg", 12000, 80),
    ];

    for (title, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, title, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(title)
        .bind(price as i64)
        .bind(stock as i32)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
