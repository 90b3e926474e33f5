//! End-to-end tests of the `activation-graph` binary: exit codes and the
//! JSON-lines report stream.

mod exit_codes;
mod helpers;
mod simulate;
