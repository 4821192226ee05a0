use std::error::Error;
use std::sync::Arc;

use slog::info;

use recipebook::auth::AuthConfig;
use recipebook::config::get_variable;
use recipebook::db::PgDb;
use recipebook::environment::Environment;
use recipebook::log::initialize_logger;
use recipebook::routes;
use recipebook::urls::Urls;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let port: u16 = get_variable("BACKEND_PORT")
        .parse()
        .expect("parse BACKEND_PORT as u16");

    info!(logger, "Starting..."; "port" => port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::PgPool::connect(&connection_string)
        .await
        .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let auth = Arc::new(AuthConfig::from_env());
    let urls = Arc::new(Urls::new(
        get_variable("BACKEND_BASE_URL"),
        get_variable("BACKEND_RECIPES_PATH"),
        get_variable("BACKEND_GROUPS_PATH"),
    ));

    let environment = Environment::new(logger.clone(), db, auth, urls);

    let routes = routes::make_routes(environment);

    let (_, server) =
        warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async {
            tokio::signal::ctrl_c()
                .await
                .expect("listen for shutdown signal");
        });

    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
