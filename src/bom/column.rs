//! Column metadata for tabular BOM output.

use std::fmt;

use serde::Serialize;

/// Kind of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free text.
    Text,
    /// Whole number.
    Integer,
    /// Money amount.
    Currency,
    /// Absolute URL.
    Url,
}

/// Columns of a BOM table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BomColumn {
    /// Part identity.
    Id,
    /// Total quantity needed.
    Quantity,
    /// Vendor or source label.
    Source,
    /// Quantity times unit cost.
    Cost,
    /// Cost of one unit.
    UnitCost,
    /// Part title.
    Title,
    /// Part page.
    Url,
}

impl BomColumn {
    /// Every column in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Id,
        Self::Quantity,
        Self::Source,
        Self::Cost,
        Self::UnitCost,
        Self::Title,
        Self::Url,
    ];

    /// Header text.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Quantity => "Quantity",
            Self::Source => "Source",
            Self::Cost => "Cost",
            Self::UnitCost => "Unit Cost",
            Self::Title => "Title",
            Self::Url => "URL",
        }
    }

    /// Value kind.
    #[must_use]
    pub fn item_type(self) -> ColumnType {
        match self {
            Self::Id | Self::Source | Self::Title => ColumnType::Text,
            Self::Quantity => ColumnType::Integer,
            Self::Cost | Self::UnitCost => ColumnType::Currency,
            Self::Url => ColumnType::Url,
        }
    }

    /// Full description of this column.
    #[must_use]
    pub fn describe(self) -> BomColumnDescription {
        BomColumnDescription {
            column: self,
            title: self.title(),
            item_type: self.item_type(),
        }
    }
}

impl fmt::Display for BomColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Header metadata for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BomColumnDescription {
    /// The column described.
    pub column: BomColumn,
    /// Header text.
    pub title: &'static str,
    /// Value kind.
    pub item_type: ColumnType,
}
