pub mod app;
pub mod chunk;
pub mod config;
pub mod domain;
pub mod entrez;
pub mod error;
pub mod genbank;
pub mod output;
pub mod resolver;
pub mod table;
