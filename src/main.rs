mod article;
mod db;
mod types;
mod utils;


use log::error;
use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::Value;
use rocket::{catch, catchers, get, routes, Build, Rocket};
use serde_json::json;

#[get("/")]
fn index() -> Value {
    json!({ "message": "Hello World", "status": "OK 200" })
}

#[catch(404)]
fn not_found(_req: &Request) -> Value {
    json!({
        "errors": [
            "entity not found"
        ]
    })
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Value {
    json!({
        "errors": [
            status.reason_lossy()
        ]
    })
}

fn build(database_url: String) -> Rocket<Build> {
    rocket::build()
        .attach(AdHoc::try_on_ignite("Article store", move |rocket| async move {
            match db::init_pool(&database_url) {
                Ok(pool) => Ok(rocket.manage(pool)),
                Err(e) => {
                    error!("failed to open article store at {}: {}", database_url, e);
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/",
            routes![
                index,
                article::list,
                article::get,
                article::get_by_title,
                article::create,
                article::update_article,
                article::delete_article
            ],
        )
        .register("/", catchers![not_found, default_catcher])
}

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let _rocket = build(db::database_url()).launch().await?;
    Ok(())
}
