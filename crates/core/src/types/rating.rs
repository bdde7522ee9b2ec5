//! Star ratings and their per-product distribution.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a value is not a valid star rating.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i64,
}

/// A review rating of one to five stars.
///
/// ```
/// use bazaar_core::Rating;
///
/// assert!(Rating::new(5).is_ok());
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Validate a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    /// Number of stars.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// All ratings from one to five stars.
    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(self.0), buf)
    }
}

/// One bucket of a [`RatingDistribution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: Rating,
    pub count: u32,
}

/// How many reviews a product received at each star level.
///
/// Serialized as `[{ "rating": 1, "count": n }, ...]`, lowest rating first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingDistribution([u32; 5]);

impl RatingDistribution {
    /// Build a distribution from per-star counts, one star first.
    #[must_use]
    pub const fn from_counts(counts: [u32; 5]) -> Self {
        Self(counts)
    }

    /// Tally a set of ratings.
    pub fn tally(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let mut counts = [0_u32; 5];
        for rating in ratings {
            if let Some(slot) = counts.get_mut(usize::from(rating.get() - 1)) {
                *slot += 1;
            }
        }
        Self(counts)
    }

    /// Number of reviews with the given rating.
    #[must_use]
    pub fn count(&self, rating: Rating) -> u32 {
        self.0
            .get(usize::from(rating.get() - 1))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of reviews counted.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Mean rating rounded to one decimal place, or `0.0` with no reviews.
    #[must_use]
    pub fn average(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u32 = Rating::all().map(|r| u32::from(r.get()) * self.count(r)).sum();
        (f64::from(weighted) / f64::from(total) * 10.0).round() / 10.0
    }

    /// Share of reviews with the given rating, as a whole percentage.
    #[must_use]
    pub fn percent(&self, rating: Rating) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (f64::from(self.count(rating)) * 100.0 / f64::from(total)).round() as u32
    }

    /// Per-star counts, one star first.
    #[must_use]
    pub const fn counts(&self) -> [u32; 5] {
        self.0
    }

    /// Buckets, one star first.
    pub fn buckets(&self) -> impl Iterator<Item = RatingCount> + '_ {
        Rating::all().map(|rating| RatingCount {
            rating,
            count: self.count(rating),
        })
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.buckets())
    }
}

impl<'de> Deserialize<'de> for RatingDistribution {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let buckets = Vec::<RatingCount>::deserialize(deserializer)?;
        let mut counts = [0_u32; 5];
        for bucket in buckets {
            if let Some(slot) = counts.get_mut(usize::from(bucket.rating.get() - 1)) {
                *slot = bucket.count;
            }
        }
        Ok(Self(counts))
    }
}
