pub mod adapter;
pub mod postgrest;
pub mod rows;

pub use adapter::SupabaseAdapter;
pub use postgrest::{PostgrestClient, TableQuery, TableSource};
