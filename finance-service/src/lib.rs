//! Finance Service - statement ingestion, categories, budgets and spending
//! summaries for personal finance.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
