//! Tower layers and redirect helpers shared by the transport engines
//!
//! ## Available Layers
//!
//! - [`UserAgentLayer`] - Adds the client User-Agent when a request carries none
//! - [`RedirectPolicy`] - Redirect policy for tower-http's `FollowRedirect`
//!
//! The free functions behind them are reused by the pooled engine, which
//! follows redirects without a tower stack.

mod redirect;
mod user_agent;

pub use redirect::{
    RedirectLimit, RedirectPolicy, is_https_downgrade, is_redirect, is_same_origin,
    next_hop_method, strip_sensitive_headers,
};
pub use user_agent::{UserAgentLayer, UserAgentService, apply_default_user_agent};
