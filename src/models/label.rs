use serde::{Deserialize, Serialize};

/// 数词标签状态
///
/// 数据库中以整数编码保存：`NULL` 未标注，`0` 基数，`1` 序数，`2` 无数字含义，`-1` 失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    /// 未标注
    Unlabeled,
    /// 基数含义（表示数量，如"一百人"的"一百"）
    Cardinal,
    /// 序数含义（表示顺序，如"三楼"的"三"）
    Ordinal,
    /// 无数字含义（如"一向"的"一"、"万一"的"万"）
    Idiomatic,
    /// 处理失败
    Failed,
}

impl LabelType {
    /// 所有终态，按报告顺序排列
    pub const TERMINAL: [LabelType; 4] = [
        LabelType::Failed,
        LabelType::Cardinal,
        LabelType::Ordinal,
        LabelType::Idiomatic,
    ];

    /// 数据库编码，未标注为 `None`
    pub fn code(self) -> Option<i64> {
        match self {
            LabelType::Unlabeled => None,
            LabelType::Cardinal => Some(0),
            LabelType::Ordinal => Some(1),
            LabelType::Idiomatic => Some(2),
            LabelType::Failed => Some(-1),
        }
    }

    /// 从数据库编码解析，未知编码返回 `None`
    pub fn from_code(code: Option<i64>) -> Option<Self> {
        match code {
            None => Some(LabelType::Unlabeled),
            Some(0) => Some(LabelType::Cardinal),
            Some(1) => Some(LabelType::Ordinal),
            Some(2) => Some(LabelType::Idiomatic),
            Some(-1) => Some(LabelType::Failed),
            Some(_) => None,
        }
    }

    /// 解析模型返回的 `type` 值，只接受 0、1、2
    pub fn from_oracle_type(value: i64) -> Option<Self> {
        match value {
            0 => Some(LabelType::Cardinal),
            1 => Some(LabelType::Ordinal),
            2 => Some(LabelType::Idiomatic),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != LabelType::Unlabeled
    }

    /// 报告中显示的名称
    pub fn name(self) -> &'static str {
        match self {
            LabelType::Unlabeled => "未标注",
            LabelType::Cardinal => "基数含义",
            LabelType::Ordinal => "序数含义",
            LabelType::Idiomatic => "无数字含义",
            LabelType::Failed => "处理失败",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_storage_contract() {
        assert_eq!(LabelType::Unlabeled.code(), None);
        assert_eq!(LabelType::Cardinal.code(), Some(0));
        assert_eq!(LabelType::Ordinal.code(), Some(1));
        assert_eq!(LabelType::Idiomatic.code(), Some(2));
        assert_eq!(LabelType::Failed.code(), Some(-1));

        for label in LabelType::TERMINAL {
            assert_eq!(LabelType::from_code(label.code()), Some(label));
        }
        assert_eq!(LabelType::from_code(Some(3)), None);
    }

    #[test]
    fn test_oracle_type_rejects_out_of_range() {
        assert_eq!(LabelType::from_oracle_type(1), Some(LabelType::Ordinal));
        assert_eq!(LabelType::from_oracle_type(3), None);
        assert_eq!(LabelType::from_oracle_type(-1), None);
    }
}
