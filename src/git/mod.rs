pub mod repo;
pub mod worktree;

pub use repo::{GitRepo, PRIMARY_BRANCHES};
pub use worktree::{CheckoutGuard, GitWorktree, Worktree};
