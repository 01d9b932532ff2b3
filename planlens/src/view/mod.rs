// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Consumer-side presentation helpers: outline, heatmap scale and text rendering

mod heatmap;
mod outline;
mod render;

pub use heatmap::HeatmapScale;
pub use outline::{outline, OutlineRow};
pub use render::render_plan;
