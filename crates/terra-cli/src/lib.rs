//! Library surface behind the `terra` binary: the `.traw` reference driver
//! and subcommand implementations, split out so they can be exercised by
//! integration tests without going through `std::process`.

pub mod commands;
pub mod raw_driver;
