pub mod profile;
pub mod view;
