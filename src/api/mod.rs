pub mod auth;
pub mod veo;
