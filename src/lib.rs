pub mod dispatch;
pub mod mailbox;
pub mod message;
pub mod receiver;
pub mod watch;
