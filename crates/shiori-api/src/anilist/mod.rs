pub mod client;
pub mod transport;
pub mod types;

pub use client::{AniListClient, AniListOptions};
pub use transport::{GraphQLTransport, HttpTransport};
