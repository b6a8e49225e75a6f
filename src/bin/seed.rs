use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, lorem::en::Sentence, name::en::Name},
    Fake,
};
use fitmat::{
    auth,
    domain::{CreateUserRequest, NewClass, Role, TIER_ORDER},
    repository::{
        CategoryRepository, ClassRepository, EnrollmentRepository, ReviewRepository,
        SqliteCategoryRepository, SqliteClassRepository, SqliteEnrollmentRepository,
        SqliteReviewRepository, SqliteUserRepository, UserRepository,
    },
};
use rand::{seq::SliceRandom, Rng};
use sqlx::sqlite::SqlitePoolOptions;

const ADMIN_EMAIL: &str = "admin@fitmat.local";
const DEMO_PASSWORD: &str = "password123";

#[derive(Parser, Debug)]
#[command(name = "seed", version)]
#[command(about = "Fill a Fitmat database with demo users, classes and reviews")]
struct Args {
    /// Database to seed; falls back to DATABASE_URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://fitmat.db?mode=rwc")]
    database_url: String,

    /// Members to create, spread across the membership tiers.
    #[arg(long, default_value_t = 20)]
    members: usize,

    #[arg(long, default_value_t = 4)]
    trainers: usize,

    /// Classes scheduled over the coming two weeks.
    #[arg(long, default_value_t = 12)]
    classes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let category_repo = SqliteCategoryRepository::new(db_pool.clone());
    let class_repo = SqliteClassRepository::new(db_pool.clone());
    let enrollment_repo = SqliteEnrollmentRepository::new(db_pool.clone());
    let review_repo = SqliteReviewRepository::new(db_pool.clone());

    if user_repo.find_by_email(ADMIN_EMAIL).await?.is_some() {
        println!("⚠️  Database already seeded ({} exists), nothing to do.", ADMIN_EMAIL);
        return Ok(());
    }

    let password_hash = auth::hash_password(DEMO_PASSWORD)?;
    let mut rng = rand::thread_rng();

    println!("👥 Creating users...");
    let admin = user_repo.create(CreateUserRequest {
        email: ADMIN_EMAIL.to_string(),
        password_hash: password_hash.clone(),
        name: Some("Admin User".to_string()),
        role: Role::Admin,
    }).await?;
    println!("  ✅ Created admin user ({} / {})", ADMIN_EMAIL, DEMO_PASSWORD);

    let mut trainers = Vec::with_capacity(args.trainers);
    for i in 0..args.trainers {
        let trainer = user_repo.create(CreateUserRequest {
            email: format!("trainer{}@fitmat.local", i + 1),
            password_hash: password_hash.clone(),
            name: Some(Name().fake()),
            role: Role::Trainer,
        }).await?;
        trainers.push(trainer);
    }
    println!("  ✅ Created {} trainers", trainers.len());

    let mut members = Vec::with_capacity(args.members);
    for i in 0..args.members {
        let email: String = SafeEmail().fake();
        let member = user_repo.create(CreateUserRequest {
            email: format!("{}.{}", i, email.to_lowercase()),
            password_hash: password_hash.clone(),
            name: Some(Name().fake()),
            role: TIER_ORDER[i % TIER_ORDER.len()],
        }).await?;
        members.push(member);
    }
    println!("  ✅ Created {} members", members.len());

    println!("🏷️  Creating categories...");
    let mut categories = Vec::new();
    for (name, description) in [
        ("Yoga", "Flexibility, balance and breathing"),
        ("HIIT", "High intensity interval training"),
        ("Strength", "Barbell and dumbbell work"),
        ("Cycling", "Indoor cycling sessions"),
    ] {
        categories.push(category_repo.create(name, Some(description)).await?);
    }
    println!("  ✅ Created {} categories", categories.len());

    if trainers.is_empty() {
        println!("⚠️  No trainers requested, skipping classes and reviews.");
        return Ok(());
    }

    println!("📅 Creating classes...");
    let mut class_count = 0;
    for _ in 0..args.classes {
        let trainer = trainers.choose(&mut rng).map(|t| t.id).unwrap_or(admin.id);
        let category = categories.choose(&mut rng).map(|c| c.id);
        let start = Utc::now() + Duration::hours(rng.gen_range(2..24 * 14));
        let required_role = match rng.gen_range(0..4) {
            0 => Some(Role::UserGold),
            1 => Some(Role::UserBronze),
            _ => None,
        };
        let capacity = if rng.gen_bool(0.8) { Some(rng.gen_range(5..=20)) } else { None };

        let class = class_repo.create(NewClass {
            title: format!("{} session", Sentence(1..3).fake::<String>().trim_end_matches('.')),
            description: Some(Sentence(6..14).fake()),
            start_time: start,
            end_time: start + Duration::minutes(rng.gen_range(3..=8) * 15),
            capacity,
            required_role,
            trainer_id: trainer,
            created_by_id: admin.id,
            category_id: category,
        }).await?;
        class_count += 1;

        let spots = capacity.unwrap_or(10) as usize;
        let attendees = members.choose_multiple(&mut rng, spots.min(members.len()) / 2);
        for member in attendees {
            let admitted = class.required_role.map_or(true, |required| {
                fitmat::domain::role_satisfies(member.role, required)
            });
            if admitted {
                enrollment_repo.enroll_if_available(class.id, member.id).await?;
            }
        }
    }
    println!("  ✅ Created {} classes", class_count);

    println!("⭐ Creating reviews...");
    let mut review_count = 0;
    for member in members.iter().take(members.len() / 2) {
        if let Some(trainer) = trainers.choose(&mut rng) {
            let comment: String = Sentence(5..12).fake();
            review_repo.create(member.id, trainer.id, rng.gen_range(3..=5), &comment).await?;
            review_count += 1;
        }
    }
    println!("  ✅ Created {} reviews", review_count);

    println!("\n✨ Seeding complete! Log in as {} / {}", ADMIN_EMAIL, DEMO_PASSWORD);
    Ok(())
}
