pub mod auth;
pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod group;
pub mod invite;
pub mod log;
pub mod moderation;
pub mod normalization;
pub mod pagination;
pub mod policy;
pub mod recipe;
pub mod routes;
pub mod times;
pub mod urls;
pub mod user;
