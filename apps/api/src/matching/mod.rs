pub mod handlers;
pub mod prompts;
pub mod ranking;
pub mod skills;
