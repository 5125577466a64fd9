//! Demo-data seeding.
//!
//! Every row written here carries `is_seed = TRUE`, which keeps it out of the
//! dashboard aggregates and shielded from admin mutations. `--clean` removes
//! exactly those rows and nothing else.

use chrono::{Duration, Utc};
use clap::Args;
use rand::seq::IndexedRandom;
use rand::Rng;
use sqlx::PgPool;

use codstore_core::catalog;

const NAMES: &[&str] = &[
    "Marie Ngo",
    "Jean Mbarga",
    "Aminatou Bello",
    "Paul Essomba",
    "Clarisse Fouda",
    "Ibrahim Njoya",
    "Sandrine Tchoumi",
    "Eric Kamga",
];

const CITIES: &[&str] = &["Douala", "Yaoundé", "Bafoussam", "Garoua", "Bamenda", "Kribi"];

const PATHS: &[&str] = &["/", "/produit/hismile", "/produit/gumies", "/commande", "/merci"];

const REFERRERS: &[&str] = &[
    "",
    "https://www.facebook.com/",
    "https://www.tiktok.com/",
    "https://www.google.com/",
];

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Number of demo orders to create.
    #[arg(long, default_value_t = 40)]
    pub orders: u32,
    /// Number of demo visits to create.
    #[arg(long, default_value_t = 400)]
    pub visits: u32,
    /// Spread the demo rows over the last N days.
    #[arg(long, default_value_t = 30)]
    pub days: i64,
    /// Remove previously seeded rows instead of creating new ones.
    #[arg(long)]
    pub clean: bool,
}

pub async fn run(pool: &PgPool, args: &SeedArgs) -> anyhow::Result<()> {
    if args.clean {
        let orders = codstore_db::delete_seed_orders(pool).await?;
        let visits = codstore_db::delete_seed_visits(pool).await?;
        tracing::info!(orders, visits, "seed rows removed");
        return Ok(());
    }

    let days = args.days.max(1);
    seed_orders(pool, args.orders, days).await?;
    seed_visits(pool, args.visits, days).await?;
    tracing::info!(
        orders = args.orders,
        visits = args.visits,
        days,
        "seed data created"
    );
    Ok(())
}

fn random_created_at(rng: &mut impl Rng, days: i64) -> chrono::DateTime<Utc> {
    let offset_secs = rng.random_range(0..days * 86_400);
    Utc::now() - Duration::seconds(offset_secs)
}

async fn seed_orders(pool: &PgPool, count: u32, days: i64) -> anyhow::Result<()> {
    let mut rng = rand::rng();
    let statuses = codstore_core::OrderStatus::ALL;

    for i in 0..count {
        let product = *catalog::static_products()
            .choose(&mut rng)
            .unwrap_or(&catalog::pricing_product(catalog::DEFAULT_SLUG));
        let offer = product.offers.choose(&mut rng);
        let quantity = offer.map_or(1, |o| o.qty);
        let quote = catalog::quote(product.slug, quantity)?;

        let name = NAMES.choose(&mut rng).copied().unwrap_or("Client Démo");
        let city = CITIES.choose(&mut rng).copied().unwrap_or("Douala");
        let status = statuses.choose(&mut rng).copied().unwrap_or("new");
        let phone = format!("+2376{:08}", rng.random_range(0..100_000_000u32));

        // Direct insert rather than the server path: seed rows need a spread
        // created_at and the is_seed flag.
        sqlx::query(
            "INSERT INTO orders \
                 (name, phone, city, address, product_slug, quantity, total_price, \
                  total_price_minor, product_name, product_price, status, is_seed, created_at) \
             VALUES ($1, $2, $3, '', $4, $5, $6, $7, $8, $9, $10, TRUE, $11)",
        )
        .bind(name)
        .bind(&phone)
        .bind(city)
        .bind(product.slug)
        .bind(i32::try_from(quantity).unwrap_or(1))
        .bind(quote.total.display())
        .bind(quote.total.minor())
        .bind(product.name)
        .bind(quote.unit.display())
        .bind(status)
        .bind(random_created_at(&mut rng, days))
        .execute(pool)
        .await?;

        if i % 10 == 9 {
            tracing::debug!(created = i + 1, "seeding orders");
        }
    }

    Ok(())
}

async fn seed_visits(pool: &PgPool, count: u32, days: i64) -> anyhow::Result<()> {
    let mut rng = rand::rng();

    for _ in 0..count {
        let path = PATHS.choose(&mut rng).copied().unwrap_or("/");
        let referrer = REFERRERS.choose(&mut rng).copied().unwrap_or("");
        let session = format!("seed-{:06}", rng.random_range(0..1_000_000u32));

        sqlx::query(
            "INSERT INTO visits (path, referrer, user_agent, ip, session_id, is_seed, created_at) \
             VALUES ($1, $2, 'Mozilla/5.0 (seed)', '127.0.0.1', $3, TRUE, $4)",
        )
        .bind(path)
        .bind(referrer)
        .bind(&session)
        .bind(random_created_at(&mut rng, days))
        .execute(pool)
        .await?;
    }

    Ok(())
}
