use serde::{Deserialize, Serialize};

/// A hedged pair such as `AAPL-MSFT` traded as `AAPL-<hedge>*MSFT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub name: String,
    pub hedge: f64,
    #[serde(default)]
    pub status: i64,
}

impl Pair {
    pub fn is_active(&self) -> bool {
        self.status != 0
    }

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.to_uppercase(),
            hedge: self.hedge,
            status: self.status,
        }
    }

    /// The two legs of the pair name, if it has exactly one `-`.
    pub fn legs(&self) -> Option<(&str, &str)> {
        let (first, second) = self.name.split_once('-')?;
        if second.contains('-') {
            return None;
        }
        Some((first, second))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairList {
    #[serde(default)]
    pub pairs: Vec<Pair>,
}
