//! derived-pass-client
//!
//! This crate provides a Rust client for the gateway derived pass program.
//! A derived pass is a gatekeeper network whose tokens are issued to anyone
//! already holding passes in a set of source networks.
//!
//! It includes:
//! - PDA derivation helpers and program constants
//! - account layouts and Anchor instruction builders
//! - fee resolution for issue and refresh
//! - a [`DerivedPassService`] that builds, signs and submits transactions over
//!   any [`Connection`]
//!
//! Program ids default to the deployed programs; pass a custom
//! [`ProgramIds`] for local validators.

pub mod connection;
pub mod constants;
pub mod discriminator;
pub mod errors;
pub mod fees;
pub mod instructions;
pub mod pda;
pub mod service;
pub mod state;

pub use connection::{AccountFilter, Connection, RpcConnection};
pub use constants::*;
pub use errors::{user_message, DerivedPassError, DerivedPassResult, ProgramErrorCode, ProgramFailure};
pub use fees::{FeeAction, FeeQuote, FeeResolution};
pub use pda::*;
pub use service::{DerivedPassService, FeeUpdate, Wallet};
pub use state::{
    calculate_derived_pass_size, DerivedPass, DerivedPassProperties, Fee, GatewayToken,
    GatewayTokenAccount, GatewayTokenState,
};
