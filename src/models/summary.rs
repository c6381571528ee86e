use super::LabelType;

/// 各标签的记录数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub unlabeled: u64,
    pub cardinal: u64,
    pub ordinal: u64,
    pub idiomatic: u64,
    pub failed: u64,
}

impl LabelSummary {
    pub fn count(&self, label: LabelType) -> u64 {
        match label {
            LabelType::Unlabeled => self.unlabeled,
            LabelType::Cardinal => self.cardinal,
            LabelType::Ordinal => self.ordinal,
            LabelType::Idiomatic => self.idiomatic,
            LabelType::Failed => self.failed,
        }
    }

    pub fn add(&mut self, label: LabelType, n: u64) {
        match label {
            LabelType::Unlabeled => self.unlabeled += n,
            LabelType::Cardinal => self.cardinal += n,
            LabelType::Ordinal => self.ordinal += n,
            LabelType::Idiomatic => self.idiomatic += n,
            LabelType::Failed => self.failed += n,
        }
    }

    /// 已进入终态的记录数
    pub fn labeled_total(&self) -> u64 {
        self.cardinal + self.ordinal + self.idiomatic + self.failed
    }

    /// 占已标注记录的百分比，未标注的记录不计入分母
    pub fn percentage(&self, label: LabelType) -> f64 {
        let total = self.labeled_total();
        if total == 0 || label == LabelType::Unlabeled {
            return 0.0;
        }
        self.count(label) as f64 * 100.0 / total as f64
    }
}
