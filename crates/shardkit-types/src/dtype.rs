use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Element type of a typed column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int64,
    Float64,
    Bool,
    Utf8,
}

impl DataType {
    /// Stable name used in object metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Utf8 => "utf8",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int64" => Ok(Self::Int64),
            "float64" => Ok(Self::Float64),
            "bool" => Ok(Self::Bool),
            "utf8" => Ok(Self::Utf8),
            other => Err(TypeError::UnknownDataType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for dtype in [DataType::Int64, DataType::Float64, DataType::Bool, DataType::Utf8] {
            assert_eq!(dtype.name().parse::<DataType>().unwrap(), dtype);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "decimal".parse::<DataType>().unwrap_err(),
            TypeError::UnknownDataType("decimal".into())
        );
    }

    #[test]
    fn serde_uses_metadata_names() {
        assert_eq!(serde_json::to_string(&DataType::Float64).unwrap(), "\"float64\"");
    }
}
