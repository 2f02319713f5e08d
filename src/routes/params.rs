use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::models::{DeliveryStatus, OrderStatus};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

// Fields are listed flat: serde's flatten does not coerce numbers out of query strings.
#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Stable cache key suffix for this query.
    pub fn cache_key(&self) -> String {
        let (page, per_page, _) = self.pagination().normalize();
        let status = self.status.map(|s| s.to_string()).unwrap_or_else(|| "all".into());
        let sort = self.sort_order.unwrap_or_default();
        format!("page:{page}:per:{per_page}:status:{status}:sort:{}", sort.as_str())
    }
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryListQuery {
    pub status: Option<DeliveryStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn cache_key_normalizes_defaults() {
        let query = OrderListQuery::default();
        assert_eq!(query.cache_key(), "page:1:per:20:status:all:sort:desc");

        let query = OrderListQuery {
            page: Some(2),
            status: Some(OrderStatus::Delivered),
            ..OrderListQuery::default()
        };
        assert_eq!(query.cache_key(), "page:2:per:20:status:delivered:sort:desc");
    }
}
