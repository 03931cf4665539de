// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for video stacks and track sidecars.

pub mod sidecar;
pub mod stack;
