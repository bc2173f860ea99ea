pub mod builder;
pub mod config;
pub mod formula;
pub mod session;
pub mod token;
pub mod validator;
