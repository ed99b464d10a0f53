#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

mod bignum;
mod coordinator;
mod crypto;
mod decryption;
mod error;
mod keygen;
mod messages;
mod poll;
mod sled_store;
mod store;
mod tally;

pub use bignum::*;
pub use coordinator::*;
pub use crypto::*;
pub use error::*;
pub use messages::*;
pub use poll::*;
pub use sled_store::*;
pub use store::*;
