pub mod config;
pub mod contact;
pub mod i18n;
pub mod security;
pub mod seo;
pub mod server;
pub mod storage;
