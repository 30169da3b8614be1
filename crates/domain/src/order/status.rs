//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// Kitchen workflow:
/// ```text
/// New ──► Confirmed ──► Preparing ──► Ready ──► Delivered
///  │          │             │           │
///  └──────────┴─────────────┴───────────┴──► Cancelled
/// ```
/// The workflow path is advisory: any non-terminal status may move to any
/// other status (administrative override). `Delivered` and `Cancelled` are
/// terminal and lock the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum OrderStatus {
    /// Order was placed and awaits confirmation.
    #[default]
    New,

    /// Order was accepted for its delivery Friday.
    Confirmed,

    /// Kitchen is cooking the order.
    Preparing,

    /// Order is packed and waiting for delivery.
    Ready,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was called off (terminal state).
    Cancelled,
}

/// Outcome of asking the state machine for a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one; nothing is recorded.
    Unchanged,

    /// The status changes.
    Changed {
        previous: OrderStatus,
        new: OrderStatus,
    },
}

impl OrderStatus {
    /// Every status, in workflow order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::New,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses the kitchen batch view includes by default.
    pub const KITCHEN_ACTIVE: [OrderStatus; 2] = [OrderStatus::Confirmed, OrderStatus::Preparing];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if an order in this status may be deleted.
    pub fn can_delete(&self) -> bool {
        !matches!(self, OrderStatus::Delivered)
    }

    /// Returns the next step of the kitchen workflow, if any.
    pub fn next_in_workflow(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::New => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Decides whether moving to `requested` is legal and whether it changes anything.
    pub fn transition_to(self, requested: OrderStatus) -> Result<Transition, OrderError> {
        if self.is_terminal() {
            return Err(OrderError::TerminalState {
                status: self,
                action: "change status",
            });
        }
        if self == requested {
            return Ok(Transition::Unchanged);
        }
        Ok(Transition::Changed {
            previous: self,
            new: requested,
        })
    }

    /// Returns the canonical status token.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a comma-separated status list such as `confirmed,Preparing`.
    ///
    /// Blank segments are skipped and duplicates collapse.
    pub fn parse_list(raw: &str) -> Result<Vec<OrderStatus>, OrderError> {
        let mut statuses = Vec::new();
        for token in raw.split(',').filter(|t| !t.trim().is_empty()) {
            let status: OrderStatus = token.parse()?;
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        Ok(statuses)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Accepts any letter case, surrounding whitespace, and `-` or space in
    /// place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "NEW" => Ok(OrderStatus::New),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" | "CANCELED" => Ok(OrderStatus::Cancelled),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
