use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde and database representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ConditionSeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

impl ConditionSeverity {
    fn rank(&self) -> u8 {
        match self {
            Self::Mild => 0,
            Self::Moderate => 1,
            Self::Severe => 2,
        }
    }

    /// Moderate and severe conditions warrant a follow-up appointment.
    pub fn needs_follow_up(&self) -> bool {
        self.rank() >= Self::Moderate.rank()
    }

    pub fn max(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

str_enum!(ConditionStatus {
    Active => "active",
    Monitoring => "monitoring",
    Resolved => "resolved",
});

str_enum!(AlertSeverity {
    Info => "info",
    Warning => "warning",
    Critical => "critical",
});

str_enum!(RecommendationType {
    Lifestyle => "lifestyle",
    Medication => "medication",
    Appointment => "appointment",
    Test => "test",
});

str_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(Urgency {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

str_enum!(HealthStatus {
    Excellent => "excellent",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
});

impl HealthStatus {
    /// Fixed cutoffs: ≥90 excellent, ≥75 good, ≥60 fair, else poor.
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            Self::Excellent
        } else if score >= 75 {
            Self::Good
        } else if score >= 60 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

str_enum!(RejectionReason {
    ExplicitNonmedical => "explicit-nonmedical",
    InsufficientTerms => "insufficient-terms",
});

impl RejectionReason {
    /// User-facing explanation shown next to a rejected upload.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ExplicitNonmedical => {
                "This looks like an academic or non-medical document, not a health report."
            }
            Self::InsufficientTerms => {
                "Not enough medical content was found to treat this as a health report."
            }
        }
    }
}

str_enum!(MedicationStatus {
    Active => "active",
    Stopped => "stopped",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});
