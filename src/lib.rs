/*
 * This file is part of Driftwatch.
 *
 * Copyright (C) 2025 Driftwatch contributors
 *
 * Driftwatch is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Driftwatch is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Driftwatch. If not, see <https://www.gnu.org/licenses/>.
 */

//! Driftwatch - clock drift prediction and temporal fingerprinting
//!
//! Facade over the workspace crates. Most users want [`prelude`].

pub use dw_core as core;
pub use dw_error as error;
pub use dw_protocol as protocol;

pub use dw_error::{DriftError, Result};

/// Commonly used types in one import
pub mod prelude {
    pub use dw_core::{
        apply_drift_to_clock, calculate_fingerprint_distance, create_message, generate_fingerprint,
        generate_fingerprint_hex, BeaconSync, Collector, CollectorConfig, Compensation, DriftEstimator,
        DriftPredictor, DriftProfileSpec, DriftSettings, Fingerprint, ModelKind, PredictorConfig,
        ReplayOptions, TickOutcome, TmbValidator, ValidatorConfig,
    };
    pub use dw_error::{DriftError, Result};
    pub use dw_protocol::{Beacon, SyncParameters, TmbMessage};
}
