pub mod api;
pub mod definition;
pub mod model;
