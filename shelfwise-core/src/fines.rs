//! Fine policy: configuration, stepping and assessment.
//!
//! The policy lives in a single store document, `Fine/fine_configuration`,
//! holding three numbers. Percentages apply to the price of the book; the
//! late return amount is charged per day.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{collections, DocumentStore};

/// Id of the fine policy document.
pub const FINE_DOCUMENT_ID: &str = "fine_configuration";

/// The three kinds of fine a member can be charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FineKind {
    DamagedBook,
    LostBook,
    LateReturn,
}

impl FineKind {
    pub const ALL: [FineKind; 3] = [
        FineKind::DamagedBook,
        FineKind::LostBook,
        FineKind::LateReturn,
    ];

    /// Allowed range and step for this kind's setting.
    pub fn bounds(&self) -> FineBounds {
        match self {
            FineKind::DamagedBook => FineBounds {
                min: 0.0,
                max: 100.0,
                step: 5.0,
            },
            FineKind::LostBook => FineBounds {
                min: 0.0,
                max: 200.0,
                step: 5.0,
            },
            FineKind::LateReturn => FineBounds {
                min: 0.0,
                max: 100.0,
                step: 1.0,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FineKind::DamagedBook => "Damaged books",
            FineKind::LostBook => "Lost books",
            FineKind::LateReturn => "Late return",
        }
    }

    /// Display suffix for the setting's value.
    pub fn unit(&self) -> &'static str {
        match self {
            FineKind::DamagedBook | FineKind::LostBook => "% of the book's price",
            FineKind::LateReturn => " per day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FineBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl FineBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && (self.min..=self.max).contains(&value)
    }
}

/// Stored fine policy. Fields missing from the stored document read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FineConfiguration {
    /// Percent of the book price, 0..=100
    pub damaged_books_percentage: f64,
    /// Percent of the book price, 0..=200
    pub lost_books_percentage: f64,
    /// Amount per day late, 0..=100
    pub late_return_fixed_amount: f64,
}

impl FineConfiguration {
    pub fn value(&self, kind: FineKind) -> f64 {
        match kind {
            FineKind::DamagedBook => self.damaged_books_percentage,
            FineKind::LostBook => self.lost_books_percentage,
            FineKind::LateReturn => self.late_return_fixed_amount,
        }
    }

    fn value_mut(&mut self, kind: FineKind) -> &mut f64 {
        match kind {
            FineKind::DamagedBook => &mut self.damaged_books_percentage,
            FineKind::LostBook => &mut self.lost_books_percentage,
            FineKind::LateReturn => &mut self.late_return_fixed_amount,
        }
    }

    /// Set a value, rejecting anything outside the kind's bounds.
    pub fn set(&mut self, kind: FineKind, value: f64) -> Result<()> {
        let bounds = kind.bounds();
        if !bounds.contains(value) {
            return Err(Error::InvalidFineConfig(format!(
                "{} must be between {} and {}, got {}",
                kind.label(),
                bounds.min,
                bounds.max,
                value
            )));
        }
        *self.value_mut(kind) = value;
        Ok(())
    }

    /// Raise by one step, clamped to the maximum.
    pub fn step_up(&mut self, kind: FineKind) -> f64 {
        self.step(kind, 1.0)
    }

    /// Lower by one step, clamped to the minimum.
    pub fn step_down(&mut self, kind: FineKind) -> f64 {
        self.step(kind, -1.0)
    }

    fn step(&mut self, kind: FineKind, direction: f64) -> f64 {
        let bounds = kind.bounds();
        let current = self.value(kind);
        let current = if current.is_finite() {
            current
        } else {
            bounds.min
        };
        let next = bounds.clamp(current + direction * bounds.step);
        *self.value_mut(kind) = next;
        next
    }

    pub fn validate(&self) -> Result<()> {
        for kind in FineKind::ALL {
            let bounds = kind.bounds();
            let value = self.value(kind);
            if !bounds.contains(value) {
                return Err(Error::InvalidFineConfig(format!(
                    "{} out of range: {}",
                    kind.label(),
                    value
                )));
            }
        }
        Ok(())
    }

    /// Fine owed for one incident.
    ///
    /// Damaged and lost books are charged a percentage of `book_price`;
    /// late returns are charged the fixed amount per day in `days_late`.
    pub fn assess(&self, kind: FineKind, book_price: f64, days_late: u32) -> Result<f64> {
        match kind {
            FineKind::DamagedBook | FineKind::LostBook => {
                if !book_price.is_finite() || book_price < 0.0 {
                    return Err(Error::InvalidFineConfig(format!(
                        "book price must be a non-negative number, got {}",
                        book_price
                    )));
                }
                Ok(book_price * self.value(kind) / 100.0)
            }
            FineKind::LateReturn => Ok(self.late_return_fixed_amount * f64::from(days_late)),
        }
    }

    /// Read the stored policy. `None` when no policy has been saved yet.
    pub async fn load(store: &dyn DocumentStore) -> Result<Option<Self>> {
        let Some(doc) = store
            .get_document(collections::FINE_CONFIG, FINE_DOCUMENT_ID)
            .await?
        else {
            tracing::info!("No fine configuration stored");
            return Ok(None);
        };

        let config: FineConfiguration = serde_json::from_value(Value::Object(doc.fields))
            .map_err(|e| Error::InvalidFineConfig(format!("stored policy unreadable: {e}")))?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Validate and merge the three values into the stored policy.
    pub async fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        self.validate()?;
        let Value::Object(fields) = serde_json::to_value(self)? else {
            return Err(Error::InvalidFineConfig(
                "policy did not serialize to an object".to_string(),
            ));
        };
        store
            .merge_document(collections::FINE_CONFIG, FINE_DOCUMENT_ID, fields)
            .await?;

        tracing::info!(
            damaged = self.damaged_books_percentage,
            lost = self.lost_books_percentage,
            late = self.late_return_fixed_amount,
            "Fine configuration saved"
        );
        Ok(())
    }
}
