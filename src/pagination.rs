use sea_orm::{ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIMIT: u64 = 15;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct Pagination {
    #[param(default = 1, minimum = 1)]
    pub page: Option<u64>,
    #[param(default = 15, minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Runs `select` one page at a time. Pages are 1-based.
    pub async fn fetch<C, E>(
        &self,
        db: &C,
        select: Select<E>,
    ) -> Result<PaginatedResponse<E::Model>, DbErr>
    where
        C: ConnectionTrait,
        E: EntityTrait,
        E::Model: FromQueryResult + Send + Sync,
    {
        let page = self.page();
        let limit = self.limit();
        let paginator = select.paginate(db, limit);
        let totals = paginator.num_items_and_pages().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok(PaginatedResponse {
            data,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
            current_page: page,
            page_size: limit,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_items: u64, page: u64, page_size: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(page_size)
        };

        Self {
            data,
            total_items,
            total_pages,
            current_page: page,
            page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            current_page: self.current_page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        let query = Pagination {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_LIMIT);
        assert_eq!(Pagination::default().limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn total_pages_round_up() {
        let page = PaginatedResponse::new(vec![1, 2], 31, 1, 15);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.map(|n| n * 10).data, [10, 20]);
    }
}
