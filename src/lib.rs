pub mod cli;
pub mod compose;
pub mod config;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod rewrite;
pub mod specifier;
pub mod syntax;
