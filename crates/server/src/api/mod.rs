pub mod callback;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod status;

pub use routes::create_router;
