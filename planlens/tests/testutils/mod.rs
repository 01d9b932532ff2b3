// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Test utilities for PlanLens integration tests
//!
//! - `plan_fixture`: JSON plan builders and an analyzed-plan fixture with
//!   assertion helpers

#![allow(dead_code)]

pub mod plan_fixture;
