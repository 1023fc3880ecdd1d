// Command handlers

pub mod cache;
pub mod check;
pub mod init;
