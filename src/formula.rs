use serde::{Deserialize, Serialize};

/// 定稿后的自定义公式：唯一名称加上通过语法校验的公式字符串。
/// 构建期间的 Token 序列在定稿时丢弃，只保留渲染后的文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFormula {
    pub name: String,
    pub expression_text: String,
}

impl NamedFormula {
    pub fn new(name: impl Into<String>, expression_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression_text: expression_text.into(),
        }
    }
}

/// 信息提供者持有的自定义数据集合：已定稿的公式列表，
/// 以及被选入历史化记录的名称集合（原始字段或公式均可）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomDataSet {
    /// 按创建顺序保存，列表展示顺序稳定
    formulas: Vec<NamedFormula>,
    /// 按计划定时记录的名称列表
    historized: Vec<String>,
}

impl CustomDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn formulas(&self) -> &[NamedFormula] {
        &self.formulas
    }

    pub fn historized(&self) -> &[String] {
        &self.historized
    }

    pub fn contains_formula(&self, name: &str) -> bool {
        self.formulas.iter().any(|formula| formula.name == name)
    }

    /// 仅供保存流程在语法校验通过后调用。
    pub(crate) fn push_formula(&mut self, formula: NamedFormula) {
        self.formulas.push(formula);
    }

    /// 按名称删除公式；同时从历史化选择中移除对它的引用。
    /// 返回是否确实删除了一个公式。
    pub fn remove_formula(&mut self, name: &str) -> bool {
        let before = self.formulas.len();
        self.formulas.retain(|formula| formula.name != name);
        let removed = self.formulas.len() < before;
        if removed {
            self.historized.retain(|entry| entry != name);
            tracing::info!(name, "removed custom formula");
        }
        removed
    }

    pub fn is_historized(&self, name: &str) -> bool {
        self.historized.iter().any(|entry| entry == name)
    }

    /// 切换某个名称的历史化选择，返回切换后的状态。
    pub fn toggle_historized(&mut self, name: &str) -> bool {
        if self.is_historized(name) {
            self.historized.retain(|entry| entry != name);
            false
        } else {
            self.historized.push(name.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_order_is_stable() {
        let mut set = CustomDataSet::new();
        set.push_formula(NamedFormula::new("first", "a+1"));
        set.push_formula(NamedFormula::new("second", "b*2"));
        let names: Vec<_> = set.formulas().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(set.contains_formula("first"));
        assert!(!set.contains_formula("third"));
    }

    #[test]
    fn test_remove_formula_strips_historized_reference() {
        let mut set = CustomDataSet::new();
        set.push_formula(NamedFormula::new("tempPlus5", "temperature+5"));
        set.toggle_historized("tempPlus5");
        set.toggle_historized("humidity");
        assert!(set.is_historized("tempPlus5"));

        assert!(set.remove_formula("tempPlus5"));
        assert!(!set.contains_formula("tempPlus5"));
        assert!(!set.is_historized("tempPlus5"));
        // 无关的历史化选择不受影响
        assert!(set.is_historized("humidity"));
    }

    #[test]
    fn test_remove_missing_formula_is_noop() {
        let mut set = CustomDataSet::new();
        set.push_formula(NamedFormula::new("keep", "a"));
        assert!(!set.remove_formula("missing"));
        assert_eq!(set.formulas().len(), 1);
    }

    #[test]
    fn test_toggle_historized() {
        let mut set = CustomDataSet::new();
        assert!(set.toggle_historized("temperature"));
        assert!(set.is_historized("temperature"));
        assert!(!set.toggle_historized("temperature"));
        assert!(!set.is_historized("temperature"));
    }
}
