use shiori_api::ApiError;
use shiori_core::error::CoreError;
use shiori_core::models::CatalogId;

/// Which page a load failure belongs to; picks the message shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    List,
    Detail,
    Schedule,
    Search,
}

impl Page {
    fn load_failed(self) -> &'static str {
        match self {
            Self::List => "خطا در بارگذاری لیست انیمه‌ها",
            Self::Detail => "خطا در بارگذاری اطلاعات انیمه",
            Self::Schedule => "خطا در بارگذاری برنامه پخش",
            Self::Search => "خطا در جستجو",
        }
    }
}

pub const NOT_FOUND_MESSAGE: &str = "انیمه مورد نظر یافت نشد";
pub const NOT_CONFIGURED_MESSAGE: &str = "اتصال به سرور تنظیم نشده است";
pub const CANCELLED_MESSAGE: &str = "درخواست لغو شد";

/// Failure of a page-level load, caught at the page boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PageError {
    #[error("upstream error on {page:?}: {message}")]
    Upstream { page: Page, message: String },
    #[error("not found: {0}")]
    NotFound(CatalogId),
    #[error("backend not configured: {0}")]
    Config(String),
    #[error("cancelled")]
    Cancelled,
}

impl PageError {
    pub fn from_api(page: Page, err: ApiError) -> Self {
        match err {
            ApiError::NotFound(id) => Self::NotFound(id),
            ApiError::NotConfigured(reason) => Self::Config(reason),
            other => Self::Upstream {
                page,
                message: other.to_string(),
            },
        }
    }

    /// Localized text for the page to display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Upstream { page, .. } => page.load_failed(),
            Self::NotFound(_) => NOT_FOUND_MESSAGE,
            Self::Config(_) => NOT_CONFIGURED_MESSAGE,
            Self::Cancelled => CANCELLED_MESSAGE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(#[from] CoreError),
    #[error(transparent)]
    Page(#[from] PageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_map_to_page_taxonomy() {
        let not_found = PageError::from_api(Page::Detail, ApiError::NotFound(7_i64.into()));
        assert_eq!(not_found, PageError::NotFound(7_i64.into()));
        assert_eq!(not_found.user_message(), NOT_FOUND_MESSAGE);

        let config = PageError::from_api(Page::List, ApiError::NotConfigured("no key".into()));
        assert_eq!(config.user_message(), NOT_CONFIGURED_MESSAGE);

        let upstream = PageError::from_api(Page::Schedule, ApiError::GraphQL("boom".into()));
        assert_eq!(upstream.user_message(), "خطا در بارگذاری برنامه پخش");
        assert!(upstream.to_string().contains("boom"));
    }
}
