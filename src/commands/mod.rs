pub mod build;
pub mod init;
pub mod inspect;
pub mod project;
pub mod watch;
