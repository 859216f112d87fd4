//! Authentication for parley
//!
//! Validates login/signup input, talks to the remote auth gateway and
//! persists the resulting session record.

pub mod error;
pub mod forms;
pub mod gateway;
pub mod service;

pub use error::{AuthError, Result};
pub use forms::{
    FieldError, LoginCredentials, LoginForm, SignupCredentials, SignupForm, ValidationErrors,
};
pub use gateway::AuthGateway;
pub use service::AuthService;
