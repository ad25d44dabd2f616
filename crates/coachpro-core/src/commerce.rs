//! Product to program mapping and order-completion auto-enrollment.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::enrollment::EnrollOutcome;
use crate::error::{CoachError, Result};

pub const ORDER_STATUS_COMPLETED: &str = "completed";

/// The subset of a WooCommerce order payload the enrollment hook reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCompleted {
    pub id: i64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub customer_id: i64,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

fn default_status() -> String {
    ORDER_STATUS_COMPLETED.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    IntegrationDisabled,
    NotCompleted,
    NoCustomer,
    UnknownCustomer,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderEnrollment {
    pub product_id: i64,
    pub program_id: i64,
    pub outcome: EnrollOutcome,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderResult {
    pub order_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub enrolled: Vec<OrderEnrollment>,
}

impl OrderResult {
    fn skipped(order_id: i64, reason: SkipReason) -> Self {
        Self {
            order_id,
            skipped: Some(reason),
            enrolled: Vec::new(),
        }
    }
}

impl Store {
    pub fn map_product(
        &mut self,
        product_id: i64,
        program_id: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if product_id <= 0 {
            return Err(CoachError::MissingField("product_id is required".into()));
        }
        if !self.program_exists(program_id)? {
            return Err(CoachError::ProgramNotFound(program_id.to_string()));
        }
        self.conn.execute(
            "INSERT INTO product_programs (product_id, program_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(product_id) DO UPDATE SET
               program_id = excluded.program_id,
               updated_at = excluded.updated_at",
            params![product_id, program_id, now],
        )?;
        Ok(())
    }

    /// Remove a product mapping. Returns whether one existed.
    pub fn unmap_product(&mut self, product_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM product_programs WHERE product_id = ?1",
            params![product_id],
        )?;
        Ok(removed > 0)
    }

    pub fn program_for_product(&self, product_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT program_id FROM product_programs WHERE product_id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn list_product_mappings(&self) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, program_id FROM product_programs ORDER BY product_id ASC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Enroll the order's customer in every program its products map to.
    /// Replaying the same order changes nothing.
    pub fn handle_order_completed(
        &mut self,
        order: &OrderCompleted,
        now: DateTime<Utc>,
    ) -> Result<OrderResult> {
        if !self.load_settings()?.woo_enable {
            return Ok(OrderResult::skipped(order.id, SkipReason::IntegrationDisabled));
        }
        if order.status != ORDER_STATUS_COMPLETED {
            return Ok(OrderResult::skipped(order.id, SkipReason::NotCompleted));
        }
        if order.customer_id <= 0 {
            return Ok(OrderResult::skipped(order.id, SkipReason::NoCustomer));
        }
        if !self.user_exists(order.customer_id)? {
            return Ok(OrderResult::skipped(order.id, SkipReason::UnknownCustomer));
        }

        let mut enrolled = Vec::new();
        for item in &order.line_items {
            let Some(program_id) = self.program_for_product(item.product_id)? else {
                continue;
            };
            match self.enroll(order.customer_id, program_id, now) {
                Ok(outcome) => enrolled.push(OrderEnrollment {
                    product_id: item.product_id,
                    program_id,
                    outcome,
                }),
                Err(CoachError::ProgramNotFound(_)) => {
                    tracing::warn!(
                        order_id = order.id,
                        product_id = item.product_id,
                        program_id,
                        "product maps to a missing program"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(OrderResult {
            order_id: order.id,
            skipped: None,
            enrolled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::program::ProgramInput;
    use crate::settings::SettingsUpdate;
    use crate::types::Role;

    struct Fixture {
        store: Store,
        customer: i64,
        program: i64,
    }

    fn fixture(woo_enable: bool) -> Fixture {
        let mut store = Store::open_in_memory().unwrap();
        let customer = store
            .create_user("buyer", "Buyer", None, Role::Student)
            .unwrap()
            .id;
        let program = store
            .create_program(ProgramInput {
                title: Some("Career Reset".into()),
                ..Default::default()
            })
            .unwrap()
            .id;
        store.map_product(501, program, db::now()).unwrap();
        store
            .apply_settings(SettingsUpdate {
                woo_enable: Some(woo_enable),
                ..Default::default()
            })
            .unwrap();
        Fixture {
            store,
            customer,
            program,
        }
    }

    fn order(customer_id: i64, products: &[i64]) -> OrderCompleted {
        OrderCompleted {
            id: 9001,
            status: "completed".into(),
            customer_id,
            line_items: products
                .iter()
                .map(|p| LineItem { product_id: *p })
                .collect(),
        }
    }

    #[test]
    fn completed_order_enrolls_once() {
        let mut f = fixture(true);
        let o = order(f.customer, &[501, 777]);
        let first = f.store.handle_order_completed(&o, db::now()).unwrap();
        assert_eq!(first.enrolled.len(), 1);
        assert_eq!(first.enrolled[0].outcome, EnrollOutcome::Created);

        let replay = f.store.handle_order_completed(&o, db::now()).unwrap();
        assert_eq!(replay.enrolled[0].outcome, EnrollOutcome::Reactivated);
        assert_eq!(f.store.count_rows("enrollments").unwrap(), 1);
        assert_eq!(f.store.count_rows("progress").unwrap(), 1);
        assert!(f.store.load_enrollment(f.customer, f.program).is_ok());
    }

    #[test]
    fn disabled_integration_skips() {
        let mut f = fixture(false);
        let r = f
            .store
            .handle_order_completed(&order(f.customer, &[501]), db::now())
            .unwrap();
        assert_eq!(r.skipped, Some(SkipReason::IntegrationDisabled));
        assert_eq!(f.store.count_rows("enrollments").unwrap(), 0);
    }

    #[test]
    fn guest_and_unknown_customers_skip() {
        let mut f = fixture(true);
        let guest = f
            .store
            .handle_order_completed(&order(0, &[501]), db::now())
            .unwrap();
        assert_eq!(guest.skipped, Some(SkipReason::NoCustomer));
        let ghost = f
            .store
            .handle_order_completed(&order(f.customer + 40, &[501]), db::now())
            .unwrap();
        assert_eq!(ghost.skipped, Some(SkipReason::UnknownCustomer));
    }

    #[test]
    fn non_completed_status_skips() {
        let mut f = fixture(true);
        let mut o = order(f.customer, &[501]);
        o.status = "processing".into();
        let r = f.store.handle_order_completed(&o, db::now()).unwrap();
        assert_eq!(r.skipped, Some(SkipReason::NotCompleted));
    }

    #[test]
    fn mapping_can_be_replaced_and_removed() {
        let mut f = fixture(true);
        assert_eq!(f.store.program_for_product(501).unwrap(), Some(f.program));
        assert!(f.store.map_product(501, f.program + 1, db::now()).is_err());
        assert!(f.store.unmap_product(501).unwrap());
        assert!(!f.store.unmap_product(501).unwrap());
        assert_eq!(f.store.program_for_product(501).unwrap(), None);
    }
}
