//! Specification (line item) rules

use super::{Findings, StepRules};
use crate::payload::{present, SpecificationData};

/// Tolerance when comparing the declared total against the item sum
const TOTAL_TOLERANCE: f64 = 0.01;

impl StepRules for SpecificationData {
    fn is_filled(&self) -> bool {
        self.items
            .first()
            .is_some_and(|item| present(&item.item_name))
    }

    fn check(&self, findings: &mut Findings) {
        if self.items.is_empty() {
            findings.error("items", "add at least one item");
        }

        for (i, item) in self.items.iter().enumerate() {
            if !present(&item.item_name) {
                findings.error(&format!("items[{}].item_name", i), "item name is required");
            }

            if !item.quantity.is_some_and(|q| q > 0.0) {
                findings.error(
                    &format!("items[{}].quantity", i),
                    "quantity must be greater than 0",
                );
            }

            if !present(&item.unit) {
                findings.error(&format!("items[{}].unit", i), "unit is required");
            }

            match item.price {
                Some(price) if price < 0.0 => {
                    findings.error(&format!("items[{}].price", i), "price cannot be negative")
                }
                Some(price) if i == 0 && price == 0.0 => {
                    findings.error("items[0].price", "first item must be priced")
                }
                None if i == 0 => findings.error("items[0].price", "first item must be priced"),
                _ => {}
            }
        }

        if let Some(total) = self.total_amount {
            if total < 0.0 {
                findings.error("total_amount", "total amount cannot be negative");
            } else if !self.items.is_empty() {
                let sum: f64 = self
                    .items
                    .iter()
                    .map(|item| item.quantity.unwrap_or(0.0) * item.price.unwrap_or(0.0))
                    .sum();
                if (sum - total).abs() > TOTAL_TOLERANCE {
                    findings.warning(format!(
                        "Declared total {:.2} differs from item sum {:.2}",
                        total, sum
                    ));
                }
            }
        }
    }
}
