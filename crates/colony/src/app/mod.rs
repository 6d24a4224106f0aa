pub mod bootstrap;
pub mod local_host;
