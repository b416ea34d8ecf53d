pub mod cli;
pub mod config;
pub mod crypt;
pub mod installed;
pub mod logging;
pub mod version;
pub mod watch;
