use serde::{Deserialize, Serialize};

/// Validated pagination parameters. Never fails: bad input falls back to
/// the defaults and out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    /// Clamp raw values: `page >= 1`, `1 <= size <= 100`.
    pub fn new(page: i64, size: i64) -> Self {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let size = u32::try_from(size.clamp(1, i64::from(Self::MAX_SIZE)))
            .unwrap_or(Self::DEFAULT_SIZE);
        Self { page, size }
    }

    /// Parse query-string values. A missing value takes its default; if
    /// either value is present but not an integer, both fall back to the
    /// defaults.
    pub fn parse(page: Option<&str>, size: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: u32| -> Option<i64> {
            match raw {
                None => Some(i64::from(default)),
                Some(raw) => raw.trim().parse::<i64>().ok(),
            }
        };
        match (
            parse(page, Self::DEFAULT_PAGE),
            parse(size, Self::DEFAULT_SIZE),
        ) {
            (Some(page), Some(size)) => Self::new(page, size),
            _ => Self::default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            size: Self::DEFAULT_SIZE,
        }
    }
}

/// One page of results, echoing the effective pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub size: u32,
    pub rows: Vec<T>,
}
