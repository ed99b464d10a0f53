use num_bigint::BigUint;
use num_traits::One;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// An arbitrary-precision unsigned integer that travels as a base-10 string.
///
/// Public-key shares, decryption shares and ciphertext components are all
/// opaque `BigNum`s as far as the coordinator is concerned.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BigNum(pub BigUint);

impl BigNum {
    pub fn one() -> Self {
        BigNum(BigUint::one())
    }

    pub fn into_inner(self) -> BigUint {
        self.0
    }
}

impl Deref for BigNum {
    type Target = BigUint;

    fn deref(&self) -> &BigUint {
        &self.0
    }
}

impl From<BigUint> for BigNum {
    fn from(n: BigUint) -> Self {
        BigNum(n)
    }
}

impl From<u64> for BigNum {
    fn from(n: u64) -> Self {
        BigNum(BigUint::from(n))
    }
}

/// Returned when a string is not a plain base-10 integer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cryptopoll: {0:?} is not a base-10 integer")]
pub struct ParseBigNumError(pub String);

impl FromStr for BigNum {
    type Err = ParseBigNumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // BigUint::from_str accepts a leading '+' and underscores; the wire format does not.
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseBigNumError(s.to_owned()));
        }
        BigUint::from_str(s)
            .map(BigNum)
            .map_err(|_| ParseBigNumError(s.to_owned()))
    }
}

impl fmt::Display for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BigNum({})", self.0)
    }
}

impl Serialize for BigNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BigNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BigNumVisitor;

        impl<'de> de::Visitor<'de> for BigNumVisitor {
            type Value = BigNum;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a base-10 integer string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BigNum, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigNum, E> {
                Ok(BigNum::from(v))
            }
        }

        deserializer.deserialize_any(BigNumVisitor)
    }
}

/// An ElGamal ciphertext `(c1, c2)`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: BigNum,
    pub c2: BigNum,
}

impl Ciphertext {
    pub fn new(c1: BigUint, c2: BigUint) -> Self {
        Ciphertext {
            c1: BigNum(c1),
            c2: BigNum(c2),
        }
    }

    /// The multiplicative identity `(1, 1)`, the seed of every tally fold.
    pub fn identity() -> Self {
        Ciphertext {
            c1: BigNum::one(),
            c2: BigNum::one(),
        }
    }
}
