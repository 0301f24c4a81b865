pub mod dispatcher;
pub mod github;
pub mod logging;
pub mod remote;
pub mod safety;
pub mod schemas;

pub use dispatcher::{dispatch_repo_tool, tool_catalog};
pub use github::GitHubClient;
pub use remote::{RemoteRepository, RepoError};
pub use schemas::AccessRole;
