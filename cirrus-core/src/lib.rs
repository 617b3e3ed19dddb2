//! Cirrus Core
//!
//! Core library shared by Cirrus cloud providers: resource and provider
//! abstractions, discriminated-union decoding through explicit registries,
//! and lifecycle polling for long-running remote operations.

pub mod lifecycle;
pub mod polymorphic;
pub mod provider;
pub mod resource;
pub mod waiter;

pub use lifecycle::{LifecycleState, Snapshot};
pub use polymorphic::{
    DecodeError, DynRegistry, EncodeError, RegistryError, Union, UnionRegistry, Variant,
};
pub use waiter::{
    FetchError, FetchErrorKind, NotFoundPolicy, RetryPolicy, WaitConfig, WaitError, WaitOutcome,
    wait_for,
};
