//! Order workflow status.
//!
//! Orders move through a small workflow. The machine-readable status strings
//! are part of the API (`Order.status.status`) and are persisted as-is.
//!
//! ```text
//! new ──► coreOrderWorkflow/processing ──► coreOrderWorkflow/completed
//!  │                 │
//!  └────────┬────────┘
//!           ▼
//!  coreOrderWorkflow/canceled
//! ```

use serde::{Deserialize, Serialize};

/// Workflow status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "String", try_from = "String")]
pub enum OrderStatus {
    /// Placed, not yet picked up by fulfillment.
    #[default]
    New,
    /// Being prepared for fulfillment.
    Processing,
    /// All fulfillment groups shipped.
    Completed,
    /// Canceled before completion.
    Canceled,
}

impl OrderStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 4] = [
        Self::New,
        Self::Processing,
        Self::Completed,
        Self::Canceled,
    ];

    /// The persisted, machine-readable status string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "coreOrderWorkflow/processing",
            Self::Completed => "coreOrderWorkflow/completed",
            Self::Canceled => "coreOrderWorkflow/canceled",
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Whether the workflow permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Processing | Self::Canceled)
                | (Self::Processing, Self::Completed | Self::Canceled)
        )
    }
}

const ENGLISH_LABELS: [&str; 4] = ["New", "Processing", "Completed", "Canceled"];

/// Localized status labels, keyed by primary language subtag.
const STATUS_LABELS: &[(&str, [&str; 4])] = &[
    ("en", ENGLISH_LABELS),
    ("es", ["Nuevo", "Procesando", "Completado", "Cancelado"]),
    ("fr", ["Nouveau", "En cours", "Terminé", "Annulé"]),
    ("de", ["Neu", "In Bearbeitung", "Abgeschlossen", "Storniert"]),
];

impl OrderStatus {
    /// Human readable label in the requested language.
    ///
    /// Accepts language tags such as `en`, `es-MX` or `fr_CA`; unknown
    /// languages fall back to English.
    #[must_use]
    pub fn label(self, language: &str) -> &'static str {
        let primary = language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let index = match self {
            Self::New => 0,
            Self::Processing => 1,
            Self::Completed => 2,
            Self::Canceled => 3,
        };
        let labels = STATUS_LABELS
            .iter()
            .find(|(lang, _)| *lang == primary)
            .map_or(ENGLISH_LABELS, |(_, labels)| *labels);
        labels.get(index).copied().unwrap_or("")
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
