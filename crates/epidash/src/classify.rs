// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Transmission classification of WHO situation report rows.
//!
//! The source column is free text ("Clusters of cases", "Community
//! transmission", "Local transmission", "Pending", ...). Rows are bucketed by
//! a case-insensitive prefix into five canonical categories.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransmissionType {
    Cluster,
    Community,
    Local,
    Pending,
    Other,
}

/// Prefix table, checked in order. The first match wins.
const PREFIXES: [(&str, TransmissionType); 4] = [
    ("clus", TransmissionType::Cluster),
    ("com", TransmissionType::Community),
    ("loc", TransmissionType::Local),
    ("pen", TransmissionType::Pending),
];

impl TransmissionType {
    pub const ALL: [TransmissionType; 5] = [
        TransmissionType::Cluster,
        TransmissionType::Community,
        TransmissionType::Local,
        TransmissionType::Pending,
        TransmissionType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionType::Cluster => "Cluster",
            TransmissionType::Community => "Community",
            TransmissionType::Local => "Local",
            TransmissionType::Pending => "Pending",
            TransmissionType::Other => "Other",
        }
    }
}

impl fmt::Display for TransmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total over every input: a missing value or anything without a known
/// prefix lands in [`TransmissionType::Other`].
pub fn classify(raw: Option<&str>) -> TransmissionType {
    let Some(raw) = raw else {
        return TransmissionType::Other;
    };
    let lowered = raw.to_lowercase();
    PREFIXES
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix))
        .map_or(TransmissionType::Other, |(_, category)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_case_insensitive() {
        assert_eq!(classify(Some("CLUSTER")), TransmissionType::Cluster);
        assert_eq!(classify(Some("clus")), TransmissionType::Cluster);
        assert_eq!(classify(Some("Clustered")), TransmissionType::Cluster);
        assert_eq!(classify(Some("COMMUNITY_SPREAD")), TransmissionType::Community);
        assert_eq!(classify(Some("Local transmission")), TransmissionType::Local);
        assert_eq!(classify(Some("pending")), TransmissionType::Pending);
    }

    #[test]
    fn unknown_and_missing_values_are_other() {
        assert_eq!(classify(Some("xyz")), TransmissionType::Other);
        assert_eq!(classify(Some("")), TransmissionType::Other);
        assert_eq!(classify(None), TransmissionType::Other);
        // Prefix must be at the start.
        assert_eq!(classify(Some(" cluster")), TransmissionType::Other);
        assert_eq!(classify(Some("co")), TransmissionType::Other);
    }

    #[test]
    fn classifying_a_category_name_is_a_fixed_point() {
        for category in TransmissionType::ALL {
            assert_eq!(classify(Some(category.as_str())), category);
        }
    }
}
