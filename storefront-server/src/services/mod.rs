pub mod https;

pub use https::build_app;
