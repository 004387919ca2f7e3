use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode, Encode, Type,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,
    #[error("price `{0}` is not a decimal number")]
    NotANumber(String),
    #[error("price `{0}` is negative")]
    Negative(String),
    #[error("price `{0}` is too large")]
    OutOfRange(String),
}

/// Dish price, always held with exactly two fractional digits.
///
/// Every constructor goes through [`Price::from_decimal`], so a value parsed
/// from a request, decoded from the store or built in code renders the same
/// way. Midpoints round away from zero: `9.995` becomes `10.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(Decimal);

impl Price {
    pub fn from_decimal(value: Decimal) -> Result<Self, PriceError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PriceError::Negative(value.to_string()));
        }
        // drop the sign of `-0` so it renders as 0.00
        let value = if value.is_zero() { Decimal::ZERO } else { value };
        let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(2);
        // rescale keeps a smaller scale when the mantissa has no room left
        if value.scale() != 2 {
            return Err(PriceError::OutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        // rust_decimal skips digit separators, a price must not carry them
        if s.contains('_') {
            return Err(PriceError::NotANumber(s.to_string()));
        }
        let value = Decimal::from_str(s).map_err(|_| PriceError::NotANumber(s.to_string()))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl<'de> de::Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        Price::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        Price::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        // shortest round-trip text keeps `9.995` from turning into 9.99499..
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

// Stored as normalized TEXT and re-normalized on the way out.
impl Type<Sqlite> for Price {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Price {
    fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        <String as Encode<'q, Sqlite>>::encode(self.to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Price {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<Sqlite>>::decode(value)?;
        Ok(text.parse::<Price>()?)
    }
}
