pub mod health;
pub mod post_login;
