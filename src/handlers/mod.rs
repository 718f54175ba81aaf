mod admin;
mod articles;
mod auth;
mod forum;
mod messages;
mod profile;
mod routes;
mod uploads;

pub use admin::*;
pub use articles::*;
pub use auth::*;
pub use forum::*;
pub use messages::*;
pub use profile::*;
pub use routes::*;
pub use uploads::uploads_root;
