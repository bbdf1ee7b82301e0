use crate::db::schema::articles;
use crate::db::DbConnection;
use crate::types::{ApiError, ApiResult, ArticleId, ValidationError};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete, insert_into, update};
use log::info;
use rocket::serde::json::Json;
use rocket::{get, post, put};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Identifiable, Queryable, Selectable, PartialEq, Eq, Clone, Debug)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Article {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
}

impl Serialize for Article {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Article", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("author", &self.author)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("content", &self.content)?;
        s.end()
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "< Article {:?} >", self.title)
    }
}

impl Article {
    pub fn list_all(connection: &mut SqliteConnection) -> Result<Vec<Article>, ApiError> {
        articles::table
            .select(Article::as_select())
            .load(connection)
            .map_err(|e| e.into())
    }

    pub fn get_by_id(id: i64, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        articles::table
            .find(id)
            .select(Article::as_select())
            .first(connection)
            .map_err(|e| e.into())
    }

    pub fn get_by_title(title: &str, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        articles::table
            .filter(articles::title.eq(title))
            .select(Article::as_select())
            .first(connection)
            .map_err(|e| e.into())
    }

    pub fn create(form: &ArticleForm, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        insert_into(articles::table)
            .values(form)
            .returning(Article::as_returning())
            .get_result(connection)
            .map_err(|e| e.into())
    }

    /// Overwrites author, title and content together.
    pub fn update(
        id: i64,
        form: &ArticleForm,
        connection: &mut SqliteConnection,
    ) -> Result<Article, ApiError> {
        update(articles::table.find(id))
            .set(form)
            .returning(Article::as_returning())
            .get_result(connection)
            .map_err(|e| e.into())
    }

    /// Removes the row and hands back what it held.
    pub fn delete(id: i64, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        delete(articles::table.find(id))
            .returning(Article::as_returning())
            .get_result(connection)
            .map_err(|e| e.into())
    }
}

#[derive(Insertable, AsChangeset, PartialEq, Eq, Debug)]
#[diesel(table_name = articles)]
pub struct ArticleForm {
    pub author: String,
    pub title: String,
    pub content: String,
}

impl ArticleForm {
    /// Pulls the three writable fields out of a request body. Every absent
    /// key is reported; unknown keys are ignored.
    pub fn from_json(body: &Value) -> Result<ArticleForm, ValidationError> {
        let mut error = ValidationError::default();
        let author = required(body, "author", &mut error);
        let title = required(body, "title", &mut error);
        let content = required(body, "content", &mut error);

        match (author, title, content) {
            (Some(author), Some(title), Some(content)) => Ok(ArticleForm {
                author,
                title,
                content,
            }),
            _ => Err(error),
        }
    }
}

fn required(body: &Value, field: &str, error: &mut ValidationError) -> Option<String> {
    match body.get(field) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(_) => {
            error.add_error(field, "must be a string");
            None
        }
        None => {
            error.add_error(field, "is missing");
            None
        }
    }
}

#[get("/articles")]
pub fn list(mut connection: DbConnection) -> ApiResult<Vec<Article>> {
    let all = Article::list_all(&mut connection)?;
    Ok(Json(all))
}

#[get("/articles/<id>")]
pub fn get(id: ArticleId, mut connection: DbConnection) -> ApiResult<Article> {
    let article = Article::get_by_id(id.key()?, &mut connection)?;
    Ok(Json(article))
}

// Only reached when the segment is not all digits.
#[get("/articles/<title>", rank = 2)]
pub fn get_by_title(title: &str, mut connection: DbConnection) -> ApiResult<Article> {
    let article = Article::get_by_title(title, &mut connection)?;
    Ok(Json(article))
}

#[post("/articles", format = "application/json", data = "<body>")]
pub fn create(mut connection: DbConnection, body: Json<Value>) -> ApiResult<Article> {
    let form = ArticleForm::from_json(&body)?;
    let article = Article::create(&form, &mut connection)?;
    info!("created {} with id {}", article, article.id);
    Ok(Json(article))
}

#[put("/articles/<id>", format = "application/json", data = "<body>")]
pub fn update_article(
    id: Option<ArticleId>,
    mut connection: DbConnection,
    body: Json<Value>,
) -> ApiResult<Article> {
    let id = id.ok_or(ApiError::NotFound)?.key()?;
    let form = ArticleForm::from_json(&body)?;
    let article = Article::update(id, &form, &mut connection)?;
    info!("updated {} with id {}", article, article.id);
    Ok(Json(article))
}

#[rocket::delete("/articles/<id>")]
pub fn delete_article(id: Option<ArticleId>, mut connection: DbConnection) -> ApiResult<Article> {
    let id = id.ok_or(ApiError::NotFound)?.key()?;
    let article = Article::delete(id, &mut connection)?;
    info!("deleted {} with id {}", article, article.id);
    Ok(Json(article))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, IN_MEMORY};
    use serde_json::json;

    fn connection() -> db::DbConnection {
        let pool = db::init_pool(IN_MEMORY).expect("in-memory pool");
        db::DbConnection(pool.get().expect("connection"))
    }

    fn form(author: &str, title: &str, content: &str) -> ArticleForm {
        ArticleForm {
            author: author.to_owned(),
            title: title.to_owned(),
            content: content.to_owned(),
        }
    }

    #[test]
    fn create_then_get_by_id_returns_written_fields() {
        let mut conn = connection();
        let created = Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        let loaded = Article::get_by_id(created.id, &mut conn).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.author, "Ada");
        assert_eq!(loaded.title, "Hello");
        assert_eq!(loaded.content, "World");

        let second = Article::create(&form("Ada", "Again", "More"), &mut conn).unwrap();
        assert_ne!(second.id, created.id);
    }

    #[test]
    fn duplicate_title_is_rejected_without_adding_a_row() {
        let mut conn = connection();
        Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        let err = Article::create(&form("Grace", "Hello", "Other"), &mut conn).unwrap_err();
        match err {
            ApiError::ConstraintViolation(error) => assert_eq!(
                error,
                ValidationError::from("title", "has already been taken")
            ),
            other => panic!("expected constraint violation, got {:?}", other),
        }
        assert_eq!(Article::list_all(&mut conn).unwrap().len(), 1);
    }

    #[test]
    fn update_overwrites_all_fields_and_keeps_id() {
        let mut conn = connection();
        let created = Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        let updated = Article::update(created.id, &form("Grace", "Bye", "Moon"), &mut conn).unwrap();
        assert_eq!(updated.id, created.id);

        let loaded = Article::get_by_id(created.id, &mut conn).unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(
            (loaded.author.as_str(), loaded.title.as_str(), loaded.content.as_str()),
            ("Grace", "Bye", "Moon")
        );
    }

    #[test]
    fn update_to_its_own_title_is_allowed() {
        let mut conn = connection();
        let created = Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        let updated = Article::update(created.id, &form("Ada", "Hello", "Edited"), &mut conn).unwrap();
        assert_eq!(updated.content, "Edited");
    }

    #[test]
    fn update_to_another_articles_title_is_rejected() {
        let mut conn = connection();
        Article::create(&form("Ada", "First", "a"), &mut conn).unwrap();
        let second = Article::create(&form("Ada", "Second", "b"), &mut conn).unwrap();
        let err = Article::update(second.id, &form("Ada", "First", "b"), &mut conn).unwrap_err();
        assert!(matches!(err, ApiError::ConstraintViolation(_)));
        assert_eq!(Article::get_by_id(second.id, &mut conn).unwrap().title, "Second");
    }

    #[test]
    fn missing_ids_are_not_found_and_leave_state_alone() {
        let mut conn = connection();
        Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        assert!(matches!(Article::get_by_id(42, &mut conn), Err(ApiError::NotFound)));
        assert!(matches!(
            Article::update(42, &form("a", "b", "c"), &mut conn),
            Err(ApiError::NotFound)
        ));
        assert!(matches!(Article::delete(42, &mut conn), Err(ApiError::NotFound)));

        let all = Article::list_all(&mut conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Hello");
    }

    #[test]
    fn delete_returns_prior_state_and_removes_row() {
        let mut conn = connection();
        let keep = Article::create(&form("Ada", "Keep", "x"), &mut conn).unwrap();
        let gone = Article::create(&form("Ada", "Gone", "y"), &mut conn).unwrap();

        let deleted = Article::delete(gone.id, &mut conn).unwrap();
        assert_eq!(deleted, gone);
        assert!(matches!(Article::get_by_id(gone.id, &mut conn), Err(ApiError::NotFound)));
        assert_eq!(Article::list_all(&mut conn).unwrap(), vec![keep]);
    }

    #[test]
    fn get_by_title_is_exact_match() {
        let mut conn = connection();
        let created = Article::create(&form("Ada", "Hello", "World"), &mut conn).unwrap();
        assert_eq!(Article::get_by_title("Hello", &mut conn).unwrap(), created);
        assert!(matches!(
            Article::get_by_title("Hell", &mut conn),
            Err(ApiError::NotFound)
        ));
    }

    #[test]
    fn list_all_on_empty_table_is_empty() {
        let mut conn = connection();
        assert!(Article::list_all(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn encodes_exactly_four_fields() {
        let article = Article {
            id: 7,
            author: "Ada".into(),
            title: "Hello".into(),
            content: "World".into(),
        };
        assert_eq!(
            serde_json::to_value(&article).unwrap(),
            json!({"id": 7, "author": "Ada", "title": "Hello", "content": "World"})
        );
        assert_eq!(article.to_string(), "< Article \"Hello\" >");
    }

    #[test]
    fn decode_requires_every_field() {
        let body = json!({"author": "Ada", "title": "Hello", "content": "World", "extra": 1});
        assert_eq!(ArticleForm::from_json(&body).unwrap(), form("Ada", "Hello", "World"));

        let mut missing = ValidationError::from("author", "is missing");
        missing.add_error("content", "is missing");
        assert_eq!(ArticleForm::from_json(&json!({"title": "Hello"})).unwrap_err(), missing);

        let error = ArticleForm::from_json(&json!({"author": 1, "title": "t", "content": "c"}))
            .unwrap_err();
        assert_eq!(error, ValidationError::from("author", "must be a string"));

        missing.add_error("title", "is missing");
        assert_eq!(ArticleForm::from_json(&json!([])).unwrap_err(), missing);
    }
}
