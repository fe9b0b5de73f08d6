//! Test utilities for running assembly end to end.
