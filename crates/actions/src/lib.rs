//! `actions` crate — the `Action` model, the `ActionHandler` trait, and the
//! built-in handler implementations.
//!
//! Every action kind — built-in and custom alike — is executed through
//! [`ActionHandler`].  The engine crate dispatches through a
//! [`HandlerRegistry`] keyed by the action-type tag, so new kinds are added
//! by registering a handler rather than editing a central branch.

pub mod error;
pub mod model;
pub mod traits;
pub mod registry;
pub mod handlers;
pub mod mock;

pub use error::ActionError;
pub use handlers::delivery::DeliveryConfig;
pub use model::{Action, ActionKind, DataOperation};
pub use traits::{ActionContext, ActionHandler};
pub use registry::HandlerRegistry;
