// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Failure handling shared by the engine and the store adapters.

pub mod retry;
pub mod cooldown;
pub mod connectivity;
pub mod best_effort;
