//! `qry`: load a domain and a stored query, apply an edit, print the result.

pub mod cli;
pub mod commands;
pub mod input;
pub mod logging;
