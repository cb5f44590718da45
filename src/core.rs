pub mod archive;
pub mod autoinstall;
pub mod builder;
pub mod cache;
pub mod decompression;
pub mod fetcher;
pub mod fingerprint;
pub mod host;
pub mod installer;
pub mod logo;
pub mod package;
pub mod redactor;
pub mod store;
