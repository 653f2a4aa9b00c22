use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 候选生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Basic,
    CrossSectional,
    MeanReversion,
    Momentum,
    Volatility,
    Value,
    Conditional,
    MultiField,
    Advanced,
    /// Alpha101 风格经典因子
    Classic,
    Combined,
}

impl Mode {
    pub const ALL: [Mode; 11] = [
        Mode::Basic,
        Mode::CrossSectional,
        Mode::MeanReversion,
        Mode::Momentum,
        Mode::Volatility,
        Mode::Value,
        Mode::Conditional,
        Mode::MultiField,
        Mode::Advanced,
        Mode::Classic,
        Mode::Combined,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::CrossSectional => "cross-sectional",
            Self::MeanReversion => "mean-reversion",
            Self::Momentum => "momentum",
            Self::Volatility => "volatility",
            Self::Value => "value",
            Self::Conditional => "conditional",
            Self::MultiField => "multi-field",
            Self::Advanced => "advanced",
            Self::Classic => "classic",
            Self::Combined => "combined",
        }
    }

    /// 旧版菜单编号 1-7
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Basic),
            2 => Some(Self::MultiField),
            3 => Some(Self::Advanced),
            4 => Some(Self::Momentum),
            5 => Some(Self::Value),
            6 => Some(Self::Classic),
            7 => Some(Self::Combined),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| format!("无效的策略模式编号: {}", code));
        }
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "basic" => Ok(Self::Basic),
            "crosssectional" | "rank" => Ok(Self::CrossSectional),
            "meanreversion" | "reversion" => Ok(Self::MeanReversion),
            "momentum" => Ok(Self::Momentum),
            "volatility" | "vol" => Ok(Self::Volatility),
            "value" => Ok(Self::Value),
            "conditional" | "regime" => Ok(Self::Conditional),
            "multifield" | "multifactor" | "multi" => Ok(Self::MultiField),
            "advanced" => Ok(Self::Advanced),
            "classic" | "alpha101" => Ok(Self::Classic),
            "combined" => Ok(Self::Combined),
            _ => Err(format!("未知的策略模式: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("basic".parse::<Mode>(), Ok(Mode::Basic));
        assert_eq!("Mean_Reversion".parse::<Mode>(), Ok(Mode::MeanReversion));
        assert_eq!("cross-sectional".parse::<Mode>(), Ok(Mode::CrossSectional));
        assert_eq!("alpha101".parse::<Mode>(), Ok(Mode::Classic));
        assert_eq!("2".parse::<Mode>(), Ok(Mode::MultiField));
        assert_eq!("7".parse::<Mode>(), Ok(Mode::Combined));
        assert!("8".parse::<Mode>().is_err());
        assert!("garbage".parse::<Mode>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for m in Mode::ALL {
            assert_eq!(m.name().parse::<Mode>(), Ok(m));
        }
    }
}
