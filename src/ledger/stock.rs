use std::collections::BTreeMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products},
    error::{AppError, AppResult},
};

/// A stock reservation with the unit price captured at reservation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
}

impl ReservedLine {
    pub fn subtotal(&self) -> AppResult<i64> {
        self.price
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| AppError::Validation("Order amount is too large".into()))
    }
}

/// Sum of line subtotals, rejecting totals that do not fit in an `i64`.
pub fn order_total(lines: &[ReservedLine]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |total, line| {
        total
            .checked_add(line.subtotal()?)
            .ok_or_else(|| AppError::Validation("Order amount is too large".into()))
    })
}

fn merge_lines(items: &[(Uuid, i32)]) -> AppResult<BTreeMap<Uuid, i32>> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for &(product_id, quantity) in items {
        if quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for product {product_id} must be positive"
            )));
        }
        let entry = merged.entry(product_id).or_default();
        *entry = entry
            .checked_add(quantity)
            .ok_or_else(|| AppError::Validation("Quantity is too large".into()))?;
    }
    Ok(merged)
}

/// Validates every line against the locked product rows, then decrements stock.
///
/// Nothing is written until all lines pass, and each decrement is conditional on
/// `stock >= quantity`, so a failure anywhere leaves stock untouched once the
/// caller rolls back.
pub async fn reserve_stock<C: ConnectionTrait>(
    conn: &C,
    seller_id: Uuid,
    items: &[(Uuid, i32)],
) -> AppResult<Vec<ReservedLine>> {
    if items.is_empty() {
        return Err(AppError::Validation("Order must contain at least one item".into()));
    }
    let merged = merge_lines(items)?;
    let ids: Vec<Uuid> = merged.keys().copied().collect();

    // Ascending id order keeps lock acquisition consistent across requests.
    let products: BTreeMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut lines = Vec::with_capacity(merged.len());
    for (&product_id, &quantity) in &merged {
        let product = products
            .get(&product_id)
            .filter(|p| p.is_active && p.seller_id == seller_id)
            .ok_or(AppError::InvalidProduct(product_id))?;
        if product.stock < quantity {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }
        lines.push(ReservedLine {
            product_id,
            quantity,
            price: product.price,
        });
    }
    order_total(&lines)?;

    for line in &lines {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                requested: line.quantity,
                available: products.get(&line.product_id).map_or(0, |p| p.stock),
            });
        }
    }

    tracing::debug!(%seller_id, lines = lines.len(), "stock reserved");
    Ok(lines)
}

/// Returns reserved quantities to their products.
pub async fn restore_stock<C: ConnectionTrait>(conn: &C, items: &[(Uuid, i32)]) -> AppResult<()> {
    let merged = merge_lines(items)?;
    for (product_id, quantity) in merged {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_lines_are_merged() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let merged = merge_lines(&[(b, 1), (a, 2), (b, 3)]).unwrap();
        assert_eq!(merged.into_iter().collect::<Vec<_>>(), vec![(a, 2), (b, 4)]);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let a = Uuid::from_u128(1);
        assert!(matches!(merge_lines(&[(a, 0)]), Err(AppError::Validation(_))));
        assert!(matches!(merge_lines(&[(a, -2)]), Err(AppError::Validation(_))));
    }

    #[test]
    fn subtotal_uses_captured_price() {
        let line = ReservedLine {
            product_id: Uuid::nil(),
            quantity: 2,
            price: 100,
        };
        assert_eq!(line.subtotal().unwrap(), 200);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let huge = ReservedLine {
            product_id: Uuid::from_u128(1),
            quantity: 3,
            price: i64::MAX / 2,
        };
        assert!(matches!(huge.subtotal(), Err(AppError::Validation(_))));

        let half = ReservedLine {
            product_id: Uuid::from_u128(2),
            quantity: 1,
            price: i64::MAX / 2 + 1,
        };
        assert!(matches!(
            order_total(&[half.clone(), half]),
            Err(AppError::Validation(_))
        ));
    }
}
