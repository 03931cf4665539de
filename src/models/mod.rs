// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Track data model and session state.

pub mod store;
pub mod track;
