// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod classify_pins;
pub(crate) mod detect_sessions;
pub(crate) mod rewrite_sessions;
pub(crate) mod rewrite_signature;
