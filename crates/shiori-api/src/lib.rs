//! Upstream catalog adapters.

pub mod anilist;
pub mod backend;
pub mod error;
pub mod mock;
pub mod supabase;
pub mod traits;

pub use backend::Backend;
pub use error::ApiError;
pub use traits::{CatalogAdapter, MediaSeason, SectionStrategy};
