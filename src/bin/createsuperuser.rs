use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use sqlx::{postgres::PgPoolOptions, Row};
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🗂️  SupplyDesk - Create Superuser");
    println!("==========================================");

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env file");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    print!("Email address: ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        eprintln!("❌ Invalid email address");
        return Ok(());
    }

    let existing_user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    if existing_user.is_some() {
        eprintln!("❌ User with this email already exists");
        return Ok(());
    }

    print!("First name: ");
    io::stdout().flush()?;
    let mut firstname = String::new();
    io::stdin().read_line(&mut firstname)?;
    let firstname = firstname.trim().to_string();

    print!("Last name: ");
    io::stdout().flush()?;
    let mut lastname = String::new();
    io::stdin().read_line(&mut lastname)?;
    let lastname = lastname.trim().to_string();

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;

    if password.len() < 6 {
        eprintln!("❌ Password must be at least 6 characters long");
        return Ok(());
    }

    print!("Password (again): ");
    io::stdout().flush()?;
    let password_confirm = rpassword::read_password()?;

    if password != password_confirm {
        eprintln!("❌ Passwords don't match");
        return Ok(());
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    let user_row = sqlx::query(
        "INSERT INTO users (email, password_hash, is_active, is_superuser, created_at, updated_at)
         VALUES ($1, $2, true, true, NOW(), NOW())
         RETURNING id",
    )
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;
    let user_id: i32 = user_row.get("id");

    sqlx::query(
        "INSERT INTO profiles (user_id, firstname, lastname, role, created_at)
         VALUES ($1, $2, $3, 'admin', NOW())",
    )
    .bind(user_id)
    .bind(&firstname)
    .bind(&lastname)
    .execute(&pool)
    .await?;

    println!("✅ Superuser {} created (id {})", email, user_id);
    Ok(())
}
