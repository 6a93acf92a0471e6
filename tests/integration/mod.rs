//! Integration tests for the `cargo cut` binary

mod helpers;
mod test_release;
mod test_semver;
