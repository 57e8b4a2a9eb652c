// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Version information, shown by `--version` and sent as the user agent.

/// The version string from Cargo.toml (e.g., "0.3.0")
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");
