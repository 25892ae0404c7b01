//! Identity resolution and creation.
//!
//! [`IdentityService`] is the seam the document core uses to resolve a
//! participant's active key and verify signatures. [`IdentityFactory`]
//! creates on-chain identities, predicting the address from the factory
//! nonce and trusting the creation event when the two differ.

pub mod error;
pub mod factory;
pub mod service;

pub use error::{IdentityError, IdentityResult};
pub use factory::{FactoryContract, IdentityFactory};
pub use service::{IdentityService, LocalIdentityService};
