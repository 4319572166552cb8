use std::fmt;

use serde::{Deserialize, Serialize};

/// A y-axis slot of a chart: `y` for the primary axis, `y2`, `y3`, ... for the
/// secondary axes in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AxisId(u8);

impl AxisId {
    pub const PRIMARY: AxisId = AxisId(1);

    /// Axis for the unit at `rank` (0 = most frequent unit).
    pub fn from_rank(rank: usize) -> Self {
        Self(u8::try_from(rank + 1).unwrap_or(u8::MAX))
    }

    /// 0-based rank of the unit this axis belongs to.
    pub fn rank(&self) -> usize {
        usize::from(self.0) - 1
    }

    pub fn is_primary(&self) -> bool {
        self.0 == 1
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_primary() {
            write!(f, "y")
        } else {
            write!(f, "y{}", self.0)
        }
    }
}

impl From<AxisId> for String {
    fn from(axis: AxisId) -> Self {
        axis.to_string()
    }
}

impl TryFrom<String> for AxisId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value
            .strip_prefix('y')
            .ok_or_else(|| format!("Invalid axis id: '{}'", value))?;
        if digits.is_empty() {
            return Ok(AxisId::PRIMARY);
        }
        match digits.parse::<u8>() {
            Ok(n) if n >= 2 => Ok(AxisId(n)),
            _ => Err(format!("Invalid axis id: '{}'", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names() {
        assert_eq!(AxisId::from_rank(0).to_string(), "y");
        assert_eq!(AxisId::from_rank(1).to_string(), "y2");
        assert_eq!(AxisId::from_rank(2).to_string(), "y3");
        assert_eq!(AxisId::from_rank(2).rank(), 2);
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!(AxisId::try_from("y".to_string()), Ok(AxisId::PRIMARY));
        assert_eq!(AxisId::try_from("y3".to_string()), Ok(AxisId::from_rank(2)));
        assert!(AxisId::try_from("y1".to_string()).is_err());
        assert!(AxisId::try_from("x2".to_string()).is_err());
    }
}
