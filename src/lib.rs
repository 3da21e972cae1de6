pub mod actions;
pub mod agent;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod faq;
pub mod model;
pub mod protocol;
pub mod tools;
pub mod validation;
