pub mod email;
pub mod export;
pub mod google_auth;
pub mod identity;
pub mod jwt;
pub mod time;
