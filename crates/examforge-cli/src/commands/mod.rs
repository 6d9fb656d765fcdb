pub mod generate;
pub mod history;
pub mod init;
pub mod report;
pub mod take;
pub mod validate;
