use std::error::Error;

use dotenv::dotenv;
use slog::info;
use structopt::StructOpt;
use time::OffsetDateTime;

use recipebook::auth::hash_password;
use recipebook::config::get_variable;
use recipebook::db::{Db, PgDb};
use recipebook::log::initialize_logger;
use recipebook::user::{Registration, User, UserRole};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "create-admin",
    about = "Create an administrator account directly in the database"
)]
struct Opt {
    /// The administrator's display name
    name: String,

    /// The administrator's email address
    email: String,

    /// The administrator's password
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::PgPool::connect(&connection_string)
        .await
        .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
    let db = PgDb::new(pool);

    let registration = Registration {
        name: opt.name,
        email: opt.email,
        password: opt.password,
        bio: None,
        profile_picture: None,
    };
    registration.validate()?;

    let password_hash = hash_password(&registration.password)?;
    let user = User::create(
        registration,
        password_hash,
        UserRole::Admin,
        OffsetDateTime::now_utc(),
    );

    info!(logger, "Creating administrator..."; "email" => &user.email);
    db.insert_user(user.clone()).await?;
    info!(logger, "Created administrator"; "id" => %user.id);

    Ok(())
}
