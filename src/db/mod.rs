use diesel::connection::SimpleConnection;
use diesel::r2d2::ConnectionManager;
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use dotenv::dotenv;
use error_chain::error_chain;
use log::info;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::State;
use std::env;
use std::ops::{Deref, DerefMut};

pub mod schema;

pub const DEFAULT_DATABASE_URL: &str = "db.sqlite";
pub const IN_MEMORY: &str = ":memory:";

// An alias to the type for a pool of Diesel SQLite connections.
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub struct DbConnection(pub r2d2::PooledConnection<ConnectionManager<SqliteConnection>>);

error_chain! {
    foreign_links {
        R2D2(r2d2::Error);
        Diesel(DieselError);
    }
}

/// Attempts to retrieve a single connection from the managed database pool. If
/// no pool is currently managed, fails with an `InternalServerError` status. If
/// no connections are available, fails with a `ServiceUnavailable` status.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConnection {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<DbConnection, ()> {
        let pool = match request.guard::<&State<Pool>>().await {
            Outcome::Success(pool) => pool,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };
        match pool.get() {
            Ok(conn) => Outcome::Success(DbConnection(conn)),
            Err(_) => Outcome::Error((Status::ServiceUnavailable, ())),
        }
    }
}

// For the convenience of using a &mut DbConnection as a &mut SqliteConnection.
impl Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Storage location from `DATABASE_URL`, falling back to `db.sqlite`.
pub fn database_url() -> String {
    dotenv().ok();
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned())
}

/// Builds the pool and makes sure the `articles` table exists.
///
/// Every SQLite in-memory connection is a separate database, so `:memory:`
/// gets a single connection that is never recycled.
pub fn init_pool(database_url: &str) -> Result<Pool> {
    info!("opening article store at {}", database_url);
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = if database_url == IN_MEMORY {
        Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?
    } else {
        Pool::new(manager)?
    };

    let mut connection = pool.get()?;
    connection.batch_execute(schema::CREATE_ARTICLES)?;
    Ok(pool)
}
