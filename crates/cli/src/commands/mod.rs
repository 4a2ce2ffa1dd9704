pub mod chat;
pub mod clear;
pub mod onboard;
pub mod serve;
