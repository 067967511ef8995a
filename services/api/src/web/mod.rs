pub mod response;
pub mod rest;
pub mod routes;
pub mod state;
pub mod upload;

pub use routes::build_router;
pub use state::AppState;
