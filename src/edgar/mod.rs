// src/edgar/mod.rs
pub mod client;
pub mod filing;
pub mod models;

pub use client::{EdgarClient, FilingRetriever};
