// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for the Herald workspace.

pub mod harness;

pub use harness::{
    TEST_APP_SECRET, TestHarness, TestHarnessBuilder, message_envelope, status_envelope,
};
