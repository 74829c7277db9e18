//! Integration tests for kiln-lib.

mod common;
mod depfile_tests;
mod incremental_tests;
mod parallel_tests;
