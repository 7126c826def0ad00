pub mod about_section;
pub mod access_token;
pub mod award;
pub mod contact_message;
pub mod content;
pub mod event;
pub mod festival;
pub mod gallery;
pub mod permission;
pub mod product;
pub mod project;
pub mod role;
pub mod role_permission;
pub mod service;
pub mod talent;
pub mod talent_application;
pub mod user;
pub mod user_role;
pub mod video;
