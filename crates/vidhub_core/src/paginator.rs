/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entity_store::{Filter, FindQuery, SortDirection, SortKey};
use crate::error::{ViewError, ViewResult};
use crate::model::fields;
use vidhub_protocol::{Page, ViewParams};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A sortable API field and the document path behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub name: &'static str,
    pub path: &'static str,
    pub unique: bool,
}

impl SortField {
    pub const fn new(name: &'static str, path: &'static str) -> Self {
        Self { name, path, unique: false }
    }
}

/// The sort fields a view accepts, and its default order.
#[derive(Debug, Clone, Copy)]
pub struct SortPolicy {
    pub fields: &'static [SortField],
    pub default_field: &'static str,
    pub default_direction: SortDirection,
}

pub const CREATED_AT: SortField = SortField::new("createdAt", fields::CREATED_AT);

pub const NEWEST_FIRST: SortPolicy = SortPolicy {
    fields: &[CREATED_AT],
    default_field: "createdAt",
    default_direction: SortDirection::Desc,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub page: u64,
    pub size: u64,
    pub offset: u64,
    pub sort: Vec<SortKey>,
}

impl PageWindow {
    pub fn query(&self, filter: Filter) -> FindQuery {
        FindQuery::new(filter)
            .sorted(self.sort.clone())
            .window(self.offset, Some(self.size))
    }

    pub fn page_of<T>(&self, docs: Vec<T>, total_docs: u64) -> Page<T> {
        let total_pages = total_docs.div_ceil(self.size);
        Page {
            docs,
            total_docs,
            limit: self.size,
            page: self.page,
            total_pages,
            has_prev_page: self.page > 1,
            has_next_page: self.page < total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    default_size: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(default_size: u64) -> Self {
        Self {
            default_size: default_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn window(&self, params: &ViewParams, policy: &SortPolicy) -> ViewResult<PageWindow> {
        let page = match params.page {
            None => 1,
            Some(p) if p >= 1 => p as u64,
            Some(p) => return Err(ViewError::Validation(format!("page must be at least 1, got {p}"))),
        };
        let size = match params.limit {
            None => self.default_size,
            Some(l) if l >= 1 => (l as u64).min(MAX_PAGE_SIZE),
            Some(l) => return Err(ViewError::Validation(format!("limit must be at least 1, got {l}"))),
        };
        let offset = (page - 1)
            .checked_mul(size)
            .filter(|o| *o <= i64::MAX as u64)
            .ok_or_else(|| ViewError::Validation(format!("page {page} is out of range")))?;

        let name = params
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(policy.default_field);
        let field = policy
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ViewError::Validation(format!("cannot sort by `{name}`")))?;
        let direction = match params.sort_type.as_deref().map(str::trim) {
            None | Some("") => policy.default_direction,
            Some(raw) => parse_direction(raw)?,
        };

        let mut sort = vec![SortKey { path: field.path.to_string(), direction }];
        if !field.unique {
            sort.push(SortKey::asc(fields::ID));
        }
        Ok(PageWindow { page, size, offset, sort })
    }
}

fn parse_direction(raw: &str) -> ViewResult<SortDirection> {
    match raw.to_ascii_lowercase().as_str() {
        "asc" | "1" => Ok(SortDirection::Asc),
        "desc" | "-1" => Ok(SortDirection::Desc),
        _ => Err(ViewError::Validation(format!("unknown sortType `{raw}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO: SortPolicy = SortPolicy {
        fields: &[CREATED_AT, SortField::new("views", "views"), SortField { name: "id", path: "_id", unique: true }],
        default_field: "createdAt",
        default_direction: SortDirection::Desc,
    };

    fn params(page: Option<i64>, limit: Option<i64>) -> ViewParams {
        ViewParams {
            page,
            limit,
            ..ViewParams::default()
        }
    }

    #[test]
    fn defaults_apply() {
        let w = Paginator::new(10).window(&ViewParams::default(), &VIDEO).unwrap();
        assert_eq!((w.page, w.size, w.offset), (1, 10, 0));
        assert_eq!(w.sort, vec![SortKey::desc("createdAt"), SortKey::asc("_id")]);
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let w = Paginator::default().window(&params(Some(3), Some(500)), &VIDEO).unwrap();
        assert_eq!((w.page, w.size, w.offset), (3, 100, 200));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let p = Paginator::default();
        for bad in [params(Some(0), None), params(Some(-2), None), params(None, Some(0))] {
            assert!(matches!(p.window(&bad, &VIDEO), Err(ViewError::Validation(_))));
        }
    }

    #[test]
    fn sort_parsing() {
        let p = Paginator::default();
        let mut q = ViewParams {
            sort_by: Some("views".into()),
            sort_type: Some("1".into()),
            ..ViewParams::default()
        };
        let w = p.window(&q, &VIDEO).unwrap();
        assert_eq!(w.sort, vec![SortKey::asc("views"), SortKey::asc("_id")]);

        q.sort_by = Some("id".into());
        q.sort_type = Some("DESC".into());
        let w = p.window(&q, &VIDEO).unwrap();
        assert_eq!(w.sort, vec![SortKey::desc("_id")]);

        q.sort_type = Some("sideways".into());
        assert!(matches!(p.window(&q, &VIDEO), Err(ViewError::Validation(_))));

        q.sort_type = None;
        q.sort_by = Some("passwordHash".into());
        assert!(matches!(p.window(&q, &VIDEO), Err(ViewError::Validation(_))));
    }

    #[test]
    fn page_envelope_flags() {
        let w = Paginator::new(10).window(&params(Some(2), None), &VIDEO).unwrap();
        let page = w.page_of(vec![0u8; 10], 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page);
        assert!(page.has_next_page);

        let w = Paginator::new(10).window(&params(Some(1), None), &VIDEO).unwrap();
        let empty = w.page_of(Vec::<u8>::new(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev_page);
        assert!(!empty.has_next_page);
    }
}
