pub mod cache;
pub mod config;
pub mod error;
pub mod jalali;
pub mod lists;
pub mod models;
pub mod normalize;
pub mod schedule;
pub mod storage;
pub mod view;
