pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod filter;
pub mod output;
pub mod pagination;
pub mod records;
pub mod session;
pub mod upload;
pub mod validators;

pub use client::{ClientError, CollectionSource, HttpCollection, InMemoryCollection};
pub use controller::{ListController, ListError, ListView};
pub use records::{Application, Entity, User, Vacancy};

#[cfg(test)]
mod tests;
