//! Quill: a small blog whose entire state is one JSON file of posts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
