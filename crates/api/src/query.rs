//! Shared query parameter types for list endpoints.

use serde::{Deserialize, Serialize};

use intake_core::search::{
    clamp_limit, clamp_page, normalize_search, page_links, page_offset, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
use intake_core::types::DbId;

use crate::response::Paginated;

/// `?page=&limit=&search=` plus the per-resource filters.
///
/// Filters a resource does not support are ignored by its handler.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Users: role id.
    pub role: Option<DbId>,
    /// Modules: `active` / `inactive`.
    pub status: Option<String>,
    /// Documents: exact project name.
    pub project_name: Option<String>,
}

impl ListParams {
    /// 1-based page number.
    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }

    /// Page size, default 10, at most 100.
    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        page_offset(self.page(), self.limit())
    }

    pub fn search(&self) -> Option<String> {
        normalize_search(self.search.as_deref())
    }

    /// Query parameters other than paging that links must carry forward.
    fn carried(&self) -> Vec<(&'static str, String)> {
        let mut extra = Vec::new();
        if let Some(search) = self.search() {
            extra.push(("search", search));
        }
        if let Some(role) = self.role {
            extra.push(("role", role.to_string()));
        }
        if let Some(status) = &self.status {
            extra.push(("status", status.clone()));
        }
        if let Some(project) = &self.project_name {
            extra.push(("project_name", project.clone()));
        }
        extra
    }

    /// Wrap one page of rows with its count and navigation links.
    pub fn paginate<T: Serialize>(&self, path: &str, list: Vec<T>, count: i64) -> Paginated<T> {
        let extra = self.carried();
        let (next, previous) = page_links(path, self.page(), self.limit(), count, &extra);
        Paginated {
            list,
            count,
            next,
            previous,
        }
    }
}
