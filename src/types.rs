use crate::utils::try_respond;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::{error, warn};
use rocket::http::Status;
use rocket::request::{FromParam, Request};
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    MissingField(ValidationError),
    ConstraintViolation(ValidationError),
    Diesel(DieselError),
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        match err {
            DieselError::NotFound => ApiError::NotFound,
            // title is the only unique column besides the primary key
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::ConstraintViolation(ValidationError::from(
                    "title",
                    "has already been taken",
                ))
            }
            other => ApiError::Diesel(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::MissingField(err)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// An `/articles/<id>` segment made only of ASCII digits. Signs, blanks and
/// anything else are rejected so the segment can be tried as a title instead.
/// A digit string too large for an `i64` is still an id, just one that names
/// no article.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ArticleId(Option<i64>);

impl ArticleId {
    pub fn key(self) -> Result<i64, ApiError> {
        self.0.ok_or(ApiError::NotFound)
    }
}

impl<'a> FromParam<'a> for ArticleId {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        if param.is_empty() || !param.bytes().all(|b| b.is_ascii_digit()) {
            return Err(param);
        }
        Ok(ArticleId(param.parse().ok()))
    }
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            ApiError::NotFound => Err(Status::NotFound),

            ApiError::MissingField(error) => {
                let body = json!({ "errors": error });
                try_respond(req, &body, Status::BadRequest)
            }

            ApiError::ConstraintViolation(error) => {
                warn!("rejected write: {:?}", error);
                let body = json!({ "errors": error });
                try_respond(req, &body, Status::Conflict)
            }

            ApiError::Diesel(error) => {
                error!("storage failure: {}", error);
                Err(Status::InternalServerError)
            }
        }
    }
}
