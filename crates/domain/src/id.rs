//! Typed identifier newtypes backed by database integer keys.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database key.
            #[must_use]
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Access the raw key.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Topic`](crate::telemetry::Topic).
    TopicId
);

define_id!(
    /// Unique identifier for a [`TelemetryPoint`](crate::telemetry::TelemetryPoint).
    PointId
);

define_id!(
    /// Unique identifier for an [`Automation`](crate::automation).
    AutomationId
);

define_id!(
    /// Unique identifier for a [`Step`](crate::automation::Step).
    StepId
);

define_id!(
    /// Unique identifier for a [`Condition`](crate::automation::Condition).
    ConditionId
);
