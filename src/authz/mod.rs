//! Request authorization
//!
//! - `policy`: action → rule table for role and ownership checks
//! - `api`: extractors that reject with 401 / 403
//! - `page`: guards that redirect instead of failing
//! - `connection`: the connection request state machine
//! - `messaging`: conversation participancy and connection rules

pub mod api;
pub mod connection;
pub mod messaging;
pub mod page;
pub mod policy;

pub use api::AdminContext;
pub use connection::ConnectionDecision;
pub use messaging::MessagingPolicy;
pub use page::{AdminPage, SignedIn};
pub use policy::{
    authorize, authorize_account_management, authorize_role_change, require_roles, Action,
    Ownership,
};
