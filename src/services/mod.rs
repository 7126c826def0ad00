pub mod auth;
pub mod media;
pub mod s3;
pub mod storage;
