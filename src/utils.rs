use rocket::http::Status;
use rocket::request::Request;
use rocket::response::content::RawJson;
use rocket::response::{self, Responder, Response};
use serde_json::{self, Value};

pub fn try_respond<'r>(req: &'r Request<'_>, json: &Value, status: Status) -> response::Result<'static> {
    let body = serde_json::to_string(json).map_err(|_| Status::InternalServerError)?;
    let response = RawJson(body).respond_to(req)?;
    Response::build_from(response).status(status).ok()
}
