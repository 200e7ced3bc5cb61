// Bin Record Model - the donation bin entity and its invariants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Stable identity of a bin record. Assigned by the store on insert,
/// strictly increasing, never reused.
pub type BinId = i64;

// ============================================================================
// VERIFICATION STATUS
// ============================================================================

/// Verification status of a bin.
/// Unverified: initial state, nobody has checked the bin yet
/// Verified: someone confirmed the bin is present
/// Missing: someone reported the bin gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinStatus {
    Unverified,
    Verified,
    Missing,
}

impl BinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinStatus::Unverified => "unverified",
            BinStatus::Verified => "verified",
            BinStatus::Missing => "missing",
        }
    }

    /// Parse the database TEXT representation. Unknown values are a schema
    /// corruption, reported as a validation error rather than a panic.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "unverified" => Ok(BinStatus::Unverified),
            "verified" => Ok(BinStatus::Verified),
            "missing" => Ok(BinStatus::Missing),
            other => Err(StoreError::Validation(format!(
                "unknown bin status: {other:?}"
            ))),
        }
    }
}

impl Default for BinStatus {
    fn default() -> Self {
        BinStatus::Unverified
    }
}

impl std::fmt::Display for BinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ACCEPTED CATEGORIES
// ============================================================================

/// The closed set of donation categories a bin can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Clothing,
    Shoes,
    Electronics,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Clothing,
        Category::Shoes,
        Category::Electronics,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Clothing => "clothing",
            Category::Shoes => "shoes",
            Category::Electronics => "electronics",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clothing" => Some(Category::Clothing),
            "shoes" => Some(Category::Shoes),
            "electronics" => Some(Category::Electronics),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Independently toggleable category flags. Doubles as the category part of
/// a filter predicate set: an all-false value means "no filter active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AcceptedCategories {
    pub clothing: bool,
    pub shoes: bool,
    pub electronics: bool,
    pub other: bool,
}

impl AcceptedCategories {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn accepts(&self, category: Category) -> bool {
        match category {
            Category::Clothing => self.clothing,
            Category::Shoes => self.shoes,
            Category::Electronics => self.electronics,
            Category::Other => self.other,
        }
    }

    pub fn set(&mut self, category: Category, value: bool) {
        match category {
            Category::Clothing => self.clothing = value,
            Category::Shoes => self.shoes = value,
            Category::Electronics => self.electronics = value,
            Category::Other => self.other = value,
        }
    }

    /// True if at least one flag is set.
    pub fn any(&self) -> bool {
        self.clothing || self.shoes || self.electronics || self.other
    }

    /// True if at least one flag is set in both values (OR-across-flags
    /// category matching).
    pub fn intersects(&self, other: &AcceptedCategories) -> bool {
        (self.clothing && other.clothing)
            || (self.shoes && other.shoes)
            || (self.electronics && other.electronics)
            || (self.other && other.other)
    }

    /// Categories with a set flag, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.accepts(*c))
    }
}

// ============================================================================
// BIN RECORD
// ============================================================================

/// A donation bin as stored in the local database. Holds location info,
/// accepted categories, photo reference, favorite status, and the
/// verification tracking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinRecord {
    pub id: BinId,
    pub name: String,
    pub operator: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Opaque resource key or external URI for the bin photo.
    pub photo_ref: Option<String>,
    pub accepted: AcceptedCategories,
    pub is_favorite: bool,
    pub status: BinStatus,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub verification_count: u32,
}

/// Insert payload for a bin that does not yet have an identity.
/// Status, verification count, and timestamp take their initial values
/// when the store inserts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBin {
    pub name: String,
    pub operator: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub photo_ref: Option<String>,
    pub accepted: AcceptedCategories,
    pub is_favorite: bool,
}

impl NewBin {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        NewBin {
            name: name.into(),
            operator: None,
            latitude,
            longitude,
            photo_ref: None,
            accepted: AcceptedCategories::none(),
            is_favorite: false,
        }
    }

    /// Caller-side validation gate: blank names and out-of-range or
    /// non-finite coordinates never reach the store.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_name(&self.name)?;
        validate_coordinates(self.latitude, self.longitude)
    }

    /// Materialize the record the store will own, with the identity it
    /// assigned and the initial verification state.
    pub(crate) fn into_record(self, id: BinId) -> BinRecord {
        BinRecord {
            id,
            name: self.name,
            operator: self.operator,
            latitude: self.latitude,
            longitude: self.longitude,
            photo_ref: self.photo_ref,
            accepted: self.accepted,
            is_favorite: self.is_favorite,
            status: BinStatus::Unverified,
            last_verified_at: None,
            verification_count: 0,
        }
    }
}

/// The store enforces this one on every insert path.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("bin name must not be blank".into()));
    }
    Ok(())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), StoreError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(StoreError::Validation(format!(
            "latitude out of range: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(StoreError::Validation(format!(
            "longitude out of range: {longitude}"
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let bin = NewBin::new("   ", 40.75, -73.43);
        assert!(matches!(bin.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_valid_bin_passes() {
        let bin = NewBin::new("Campus Clothing Bin", 40.75, -73.43);
        assert!(bin.validate().is_ok());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(-91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 180.5).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_coordinates_boundaries_allowed() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [BinStatus::Unverified, BinStatus::Verified, BinStatus::Missing] {
            assert_eq!(BinStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BinStatus::parse("gone").is_err());
    }

    #[test]
    fn test_category_flags_independent() {
        let mut accepted = AcceptedCategories::none();
        assert!(!accepted.any());

        accepted.set(Category::Shoes, true);
        assert!(accepted.any());
        assert!(accepted.accepts(Category::Shoes));
        assert!(!accepted.accepts(Category::Clothing));

        accepted.set(Category::Shoes, false);
        assert!(!accepted.any());
    }

    #[test]
    fn test_intersects_is_or_across_flags() {
        let mut filter = AcceptedCategories::none();
        filter.shoes = true;
        filter.electronics = true;

        let mut shoes_only = AcceptedCategories::none();
        shoes_only.shoes = true;

        let mut clothing_only = AcceptedCategories::none();
        clothing_only.clothing = true;

        assert!(filter.intersects(&shoes_only));
        assert!(!filter.intersects(&clothing_only));
    }

    #[test]
    fn test_into_record_initial_verification_state() {
        let record = NewBin::new("Drop-Off", 40.0, -73.0).into_record(7);
        assert_eq!(record.id, 7);
        assert_eq!(record.status, BinStatus::Unverified);
        assert_eq!(record.verification_count, 0);
        assert!(record.last_verified_at.is_none());
    }
}
