pub mod catalog;
pub mod config;
pub mod cursor;
pub mod genre;
pub mod library;
pub mod model;
pub mod stats;
pub mod tags;
pub mod text;
