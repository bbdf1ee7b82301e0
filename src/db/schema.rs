diesel::table! {
    articles (id) {
        id -> BigInt,
        author -> Text,
        title -> Text,
        content -> Text,
    }
}

pub static CREATE_ARTICLES: &str = "CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    author VARCHAR(64) NOT NULL,
    title VARCHAR(100) NOT NULL UNIQUE,
    content TEXT NOT NULL
);";
