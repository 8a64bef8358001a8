mod health;
mod url;

pub use health::health_handler;
pub use self::url::{get_url_handler, shorten_url_handler};
