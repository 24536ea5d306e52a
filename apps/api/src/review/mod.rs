/// Review and keyword sessions: the stateful layer between the HTTP routes
/// and the diff, highlight, reconcile, and keyword engines.
pub mod handlers;
pub mod session;
pub mod store;
pub mod workflow;

pub use store::SessionStore;
