use clap::Parser;
use dotenv::dotenv;
use std::time::Duration;
use travel_listings::seed::{self, SeedPlan};
use travel_listings::{telemetry, DbOperations, Settings};

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Populate the database with sample users, listings, bookings and reviews")]
struct Args {
    /// Number of sample users
    #[arg(long, default_value_t = 5)]
    users: usize,

    /// Number of sample listings
    #[arg(long, default_value_t = 10)]
    listings: usize,

    /// Number of sample bookings
    #[arg(long, default_value_t = 10)]
    bookings: usize,

    /// Number of sample reviews
    #[arg(long, default_value_t = 10)]
    reviews: usize,

    /// RNG seed; the same seed always produces the same data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    telemetry::init("info,sqlx=warn");

    let config = Settings::new()?;
    let db = DbOperations::new_with_options(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(5),
    )
    .await?;
    db.migrate().await?;

    let plan = SeedPlan {
        users: args.users,
        listings: args.listings,
        bookings: args.bookings,
        reviews: args.reviews,
        seed: args.seed,
    };
    let report = seed::run(&db, &plan).await?;

    println!("{:<10} {:>8} {:>8} {:>8}", "", "created", "existing", "total");
    for (name, created, existing, total) in [
        ("users", report.created.users, report.existing.users, report.totals.users),
        ("listings", report.created.listings, report.existing.listings, report.totals.listings),
        ("bookings", report.created.bookings, report.existing.bookings, report.totals.bookings),
        ("reviews", report.created.reviews, report.existing.reviews, report.totals.reviews),
    ] {
        println!("{:<10} {:>8} {:>8} {:>8}", name, created, existing, total);
    }
    println!("Sample users log in with password \"{}\"", seed::DEFAULT_PASSWORD);

    db.close().await;
    Ok(())
}
