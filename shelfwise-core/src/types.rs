//! Domain types for shelfwise
//!
//! Records are decoded from store [`Document`]s. Decoding never panics: a
//! document that cannot become a record yields a [`SkipReason`], which the
//! aggregator reports alongside its results.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::store::Document;

// ============================================
// Field names
// ============================================

pub mod fields {
    pub const CHECK_IN_DATE: &str = "checkInDate";
    pub const BOOK_ISBN: &str = "bookISBN";
    pub const ISBN: &str = "isbn";
    pub const SELECTED_CATEGORY: &str = "selectedCategory";
    pub const FINE_AMOUNT: &str = "fineAmount";
    pub const FINE_DATE: &str = "Date";
    pub const FINE_STATUS: &str = "fineStatus";
    pub const RATINGS: &str = "ratings";
    pub const USER_TYPE: &str = "userType";
}

// ============================================
// Skipped records
// ============================================

/// Why a record did not contribute to an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Date string did not match `dd/MM/yyyy`
    MalformedDate(String),
    /// Required field absent or of the wrong type
    MissingField(String),
    /// Amount string is not a finite decimal
    InvalidAmount(String),
    /// Field present but holds an unexpected value
    InvalidField { field: String, value: String },
    /// Foreign key has no match in the catalog
    NoCatalogMatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MalformedDate(s) => write!(f, "malformed date {s:?}"),
            SkipReason::MissingField(field) => write!(f, "missing field {field}"),
            SkipReason::InvalidAmount(s) => write!(f, "invalid amount {s:?}"),
            SkipReason::InvalidField { field, value } => {
                write!(f, "invalid value {value:?} for {field}")
            }
            SkipReason::NoCatalogMatch(key) => write!(f, "no catalog entry for {key}"),
        }
    }
}

/// A record left out of an aggregate, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: SkipReason,
}

impl SkippedRecord {
    pub fn new(id: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }
}

/// Implemented by records decoded from a store document.
pub trait FromDocument: Sized {
    fn from_document(doc: &Document) -> Result<Self, SkipReason>;
}

fn required_str<'a>(doc: &'a Document, field: &str) -> Result<&'a str, SkipReason> {
    doc.get_str(field)
        .ok_or_else(|| SkipReason::MissingField(field.to_string()))
}

/// Decode every document, splitting successes from skips.
pub fn decode_all<R: FromDocument>(docs: &[Document]) -> (Vec<R>, Vec<SkippedRecord>) {
    let mut records = Vec::with_capacity(docs.len());
    let mut skipped = Vec::new();
    for doc in docs {
        match R::from_document(doc) {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::debug!(id = %doc.id, %reason, "Skipping undecodable document");
                skipped.push(SkippedRecord::new(&doc.id, reason));
            }
        }
    }
    (records, skipped)
}

// ============================================
// Records
// ============================================

/// A book check-in event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRecord {
    pub id: String,
    /// `dd/MM/yyyy`, unvalidated until aggregation
    pub check_in_date: String,
    pub book_isbn: Option<String>,
}

impl FromDocument for CheckinRecord {
    fn from_document(doc: &Document) -> Result<Self, SkipReason> {
        Ok(Self {
            id: doc.id.clone(),
            check_in_date: required_str(doc, fields::CHECK_IN_DATE)?.to_string(),
            book_isbn: doc.get_str(fields::BOOK_ISBN).map(str::to_string),
        })
    }
}

/// Payment state of a fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FineStatus {
    Paid,
    Unpaid,
}

impl FineStatus {
    /// Convert to string for store queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Paid => "Paid",
            FineStatus::Unpaid => "Unpaid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Paid" => Some(FineStatus::Paid),
            "Unpaid" => Some(FineStatus::Unpaid),
            _ => None,
        }
    }
}

/// A fine levied on a member.
#[derive(Debug, Clone, PartialEq)]
pub struct FineRecord {
    pub id: String,
    /// `dd/MM/yyyy`
    pub date: String,
    /// Decimal as stored, e.g. `"12.50"`
    pub amount: String,
    pub status: FineStatus,
}

impl FineRecord {
    /// Parsed amount, rejecting non-finite values.
    pub fn amount_value(&self) -> Result<f64, SkipReason> {
        self.amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SkipReason::InvalidAmount(self.amount.clone()))
    }
}

impl FromDocument for FineRecord {
    fn from_document(doc: &Document) -> Result<Self, SkipReason> {
        let status_str = required_str(doc, fields::FINE_STATUS)?;
        let status = FineStatus::parse(status_str).ok_or_else(|| SkipReason::InvalidField {
            field: fields::FINE_STATUS.to_string(),
            value: status_str.to_string(),
        })?;

        // Amounts are stored as strings; tolerate bare numbers too
        let amount = match doc.get(fields::FINE_AMOUNT) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SkipReason::MissingField(fields::FINE_AMOUNT.to_string())),
        };

        Ok(Self {
            id: doc.id.clone(),
            date: required_str(doc, fields::FINE_DATE)?.to_string(),
            amount,
            status,
        })
    }
}

/// Ratings left for one book. The document id is the book identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub book_isbn: String,
    pub ratings: Vec<i64>,
}

impl FromDocument for RatingRecord {
    fn from_document(doc: &Document) -> Result<Self, SkipReason> {
        let ratings = match doc.get(fields::RATINGS) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_i64().ok_or_else(|| SkipReason::InvalidField {
                        field: fields::RATINGS.to_string(),
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(SkipReason::InvalidField {
                    field: fields::RATINGS.to_string(),
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            book_isbn: doc.id.clone(),
            ratings,
        })
    }
}

/// Catalog entry: a book and its category label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub isbn: String,
    pub category: Option<String>,
}

impl FromDocument for BookRecord {
    fn from_document(doc: &Document) -> Result<Self, SkipReason> {
        Ok(Self {
            isbn: required_str(doc, fields::ISBN)?.to_string(),
            category: doc
                .get_str(fields::SELECTED_CATEGORY)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }
}

/// Book identifier → category label, built from catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookCategoryMap {
    categories: HashMap<String, String>,
}

impl BookCategoryMap {
    /// Build from catalog entries. The first entry for an identifier wins;
    /// entries without a category label are left out.
    pub fn from_books<'a>(books: impl IntoIterator<Item = &'a BookRecord>) -> Self {
        let mut categories = HashMap::new();
        for book in books {
            if let Some(category) = &book.category {
                categories
                    .entry(book.isbn.clone())
                    .or_insert_with(|| category.clone());
            }
        }
        Self { categories }
    }

    pub fn category_of(&self, isbn: &str) -> Option<&str> {
        self.categories.get(isbn).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Account role stored on `Users` documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    Member,
    Librarian,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Member => "Member",
            UserType::Librarian => "Librarian",
            UserType::Admin => "Admin",
        }
    }
}
