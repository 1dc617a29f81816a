// Live auction sync client: REST access, the event channel session, the
// cached replica and the loop that ties them together.

pub mod actions;
pub mod api;
pub mod app;
pub mod auth;
pub mod connection;
pub mod messages;
pub mod reconciler;
pub mod snapshot;
