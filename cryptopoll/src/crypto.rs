use crate::*;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Errors raised by a crypto capability provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("cryptopoll: nothing to combine")]
    NoShares,

    #[error("cryptopoll: value is not a member of the group")]
    NotInGroup,

    #[error("cryptopoll: combined decryption share is not invertible")]
    NotInvertible,
}

/// The threshold-cryptographic operations the coordinator consumes.
///
/// Implementations must make `combine_public_keys`, `combine_ciphertexts` and
/// `combine_decryption_shares` order-independent; the coordinator stores
/// submissions in arrival order and relies on that to make re-triggered
/// aggregation produce identical results.
pub trait CryptoProvider: Send + Sync {
    /// Combine every voter's public-key share into the common public key
    fn combine_public_keys(&self, shares: &[BigNum]) -> Result<BigNum, CryptoError>;

    /// Homomorphically combine two ciphertexts. `Ciphertext::identity()` must be neutral.
    fn combine_ciphertexts(&self, a: &Ciphertext, b: &Ciphertext)
        -> Result<Ciphertext, CryptoError>;

    /// Combine every voter's decryption share for a single ciphertext
    fn combine_decryption_shares(&self, shares: &[BigNum]) -> Result<BigNum, CryptoError>;

    /// Decrypt a ciphertext with a combined decryption share
    fn threshold_decrypt(
        &self,
        ciphertext: &Ciphertext,
        combined_share: &BigNum,
    ) -> Result<BigNum, CryptoError>;

    /// Whether `value` can take part in the operations above.
    ///
    /// Checked before a submission is stored, so that a malformed share is
    /// rejected up front rather than poisoning a later aggregation.
    fn contains(&self, _value: &BigNum) -> bool {
        true
    }
}

lazy_static! {
    static ref RFC3526_2048: Group = {
        let p = BigUint::parse_bytes(
            b"FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
              29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
              EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
              E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
              EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
              C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
              83655D23DCA3AD961C62F356208552BB9ED529077096966D\
              670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
              E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
              DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
              15728E5A8AACAA68FFFFFFFFFFFFFFFF",
            16,
        )
        .expect("RFC 3526 prime is valid hex");
        Group::new(p, BigUint::from(2u32))
    };
}

/// A multiplicative group modulo a prime `p` with generator `g`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub p: BigUint,
    pub g: BigUint,

    /// Upper bound (exclusive) for secret exponents: `(p - 1) / 2`
    pub q: BigUint,
}

impl Group {
    pub fn new(p: BigUint, g: BigUint) -> Self {
        let q = (&p - 1u32) >> 1u32;
        Group { p, g, q }
    }

    /// The 2048-bit MODP group from RFC 3526, generator 2
    pub fn rfc3526_2048() -> Self {
        RFC3526_2048.clone()
    }

    fn contains(&self, x: &BigUint) -> bool {
        !x.is_zero() && x < &self.p
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    fn invert(&self, x: &BigUint) -> Result<BigUint, CryptoError> {
        if !self.contains(x) {
            return Err(CryptoError::NotInvertible);
        }
        // p is prime, so x^(p-2) is the inverse of x
        Ok(x.modpow(&(&self.p - 2u32), &self.p))
    }

    fn random_exponent<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BigUint {
        // Oversample by 8 bytes so the modulo bias is negligible
        let len = ((self.q.bits() + 7) / 8) as usize + 8;
        let mut buf = vec![0u8; len];
        loop {
            rng.fill_bytes(&mut buf);
            let n = BigUint::from_bytes_be(&buf) % &self.q;
            if !n.is_zero() {
                return n;
            }
        }
    }
}

/// A voter's share of the poll key.
///
/// The secret never leaves the voter; only `public` is submitted.
#[derive(Clone)]
pub struct KeyShare {
    secret: BigUint,
    pub public: BigNum,
}

impl KeyShare {
    pub fn secret(&self) -> &BigUint {
        &self.secret
    }
}

/// n-of-n ElGamal with multiplicative homomorphism.
///
/// The common key is the product of all public-key shares, so every voter's
/// decryption share is needed to decrypt. Multiplying ciphertexts
/// component-wise multiplies the plaintexts.
#[derive(Clone, Debug)]
pub struct ElGamal {
    group: Group,
}

impl Default for ElGamal {
    fn default() -> Self {
        ElGamal::new(Group::rfc3526_2048())
    }
}

impl ElGamal {
    pub fn new(group: Group) -> Self {
        ElGamal { group }
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Generate a fresh key share for one voter
    pub fn generate_key_share<R: RngCore + CryptoRng>(&self, rng: &mut R) -> KeyShare {
        let secret = self.group.random_exponent(rng);
        let public = self.group.g.modpow(&secret, &self.group.p);
        KeyShare {
            secret,
            public: public.into(),
        }
    }

    /// Encrypt a score under the common public key. Scores must be non-zero.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        public_key: &BigNum,
        message: u64,
    ) -> Result<Ciphertext, CryptoError> {
        let m = BigUint::from(message);
        if !self.group.contains(&m) || !self.group.contains(public_key) {
            return Err(CryptoError::NotInGroup);
        }
        let r = self.group.random_exponent(rng);
        let c1 = self.group.g.modpow(&r, &self.group.p);
        let s = public_key.modpow(&r, &self.group.p);
        let c2 = self.group.mul(&s, &m);
        Ok(Ciphertext::new(c1, c2))
    }

    /// A voter's decryption share for `ciphertext`
    pub fn decryption_share(
        &self,
        ciphertext: &Ciphertext,
        secret: &BigUint,
    ) -> Result<BigNum, CryptoError> {
        if !self.group.contains(&ciphertext.c1) {
            return Err(CryptoError::NotInGroup);
        }
        Ok(ciphertext.c1.modpow(secret, &self.group.p).into())
    }

    fn product(&self, values: &[BigNum]) -> Result<BigNum, CryptoError> {
        if values.is_empty() {
            return Err(CryptoError::NoShares);
        }
        let mut acc = BigUint::one();
        for v in values {
            if !self.group.contains(v) {
                return Err(CryptoError::NotInGroup);
            }
            acc = self.group.mul(&acc, v);
        }
        Ok(acc.into())
    }
}

impl CryptoProvider for ElGamal {
    fn combine_public_keys(&self, shares: &[BigNum]) -> Result<BigNum, CryptoError> {
        self.product(shares)
    }

    fn combine_ciphertexts(
        &self,
        a: &Ciphertext,
        b: &Ciphertext,
    ) -> Result<Ciphertext, CryptoError> {
        for x in &[&a.c1, &a.c2, &b.c1, &b.c2] {
            if !self.group.contains(x) {
                return Err(CryptoError::NotInGroup);
            }
        }
        Ok(Ciphertext::new(
            self.group.mul(&a.c1, &b.c1),
            self.group.mul(&a.c2, &b.c2),
        ))
    }

    fn combine_decryption_shares(&self, shares: &[BigNum]) -> Result<BigNum, CryptoError> {
        self.product(shares)
    }

    fn threshold_decrypt(
        &self,
        ciphertext: &Ciphertext,
        combined_share: &BigNum,
    ) -> Result<BigNum, CryptoError> {
        if !self.group.contains(&ciphertext.c2) {
            return Err(CryptoError::NotInGroup);
        }
        let inverse = self.group.invert(combined_share)?;
        Ok(self.group.mul(&ciphertext.c2, &inverse).into())
    }

    fn contains(&self, value: &BigNum) -> bool {
        self.group.contains(value)
    }
}

#[cfg(test)]
pub(crate) mod test_group {
    use super::*;

    /// A small prime group that keeps debug-mode tests fast: p = 2^127 - 1
    pub fn small() -> ElGamal {
        let p = (BigUint::one() << 127u32) - 1u32;
        ElGamal::new(Group::new(p, BigUint::from(3u32)))
    }
}
