pub mod cache;
pub mod cancel;
pub mod text;
