// Copyright 2026 The Genstream Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod decode;
pub mod extract;
pub mod fallback;
pub mod frame;
pub mod generation;
pub mod phase;
pub mod server;
pub mod sse;
pub mod upstream;
