//! 公式表达式的构建器
//!
//! ## 状态机流程图
//!
//! ```text
//! append_*()
//!   ├─ 追加一个不可变 Token 到表达式序列
//!   ├─ 括号类按钮维护 open_count / close_count 结构计数
//!   └─ 更新 LastAction 标签 → enablement() 由纯查表派生五个按钮开关
//!
//! delete_last()
//!   ├─ 空表达式 → BuilderError::EmptyExpression
//!   ├─ 弹出最后一个 Token，括号类回退对应计数
//!   └─ 重放：LastAction 重置为新的最后一个 Token 的类别
//!       （序列为空时回到 Start），开关表随之自动恢复
//! ```
//!
//! ## 按钮开关规则表（按下 X 之后，下一步允许什么）
//!
//! | 上一步       | 运算符 | 数据引用 | 数字 | 左括号 | 右括号* |
//! |--------------|--------|----------|------|--------|---------|
//! | Start        | 否     | 是       | 是   | 是     | 否      |
//! | Operator     | 否     | 是       | 是   | 是     | 是      |
//! | DataRef      | 是     | 否       | 否   | 否     | 是      |
//! | Number       | 是     | 否       | 是   | 否     | 是      |
//! | LeftParen    | 否     | 是       | 是   | 是     | 否      |
//! | RightParen   | 是     | 否       | 否   | 否     | 是      |
//!
//! *右括号还受结构约束 `close_count < open_count` 限制，两者取与。
//! `LeftParen` 行禁用右括号，因此空括号对 `()` 永远无法产生。
//! `Number` 行保留数字开关，用于多位数字的连续输入。
//!
//! 构建器本身不会拒绝追加：禁用按钮的拦截发生在 UI 边界（REPL），
//! 构建器信任调用方遵守 enablement()。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    /// delete_last 在空表达式上被调用；状态保持不变。
    #[error("expression is empty, nothing to delete")]
    EmptyExpression,
}

/// 最近一次按下的按钮类别。五个按钮开关完全由该标签派生，
/// 避免五个独立布尔值各自漂移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LastAction {
    #[default]
    Start,
    Operator,
    DataRef,
    Number,
    LeftParen,
    RightParen,
}

impl LastAction {
    fn classify(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Operator => LastAction::Operator,
            TokenKind::DataRef => LastAction::DataRef,
            TokenKind::Number => LastAction::Number,
            TokenKind::LeftParen => LastAction::LeftParen,
            TokenKind::RightParen => LastAction::RightParen,
        }
    }

    /// 类别层面的查表，不含右括号的结构约束。
    fn class_enablement(self) -> ButtonEnablement {
        match self {
            LastAction::Start | LastAction::LeftParen => ButtonEnablement {
                operator: false,
                data_ref: true,
                number: true,
                left_paren: true,
                right_paren: false,
            },
            LastAction::Operator => ButtonEnablement {
                operator: false,
                data_ref: true,
                number: true,
                left_paren: true,
                right_paren: true,
            },
            LastAction::DataRef | LastAction::RightParen => ButtonEnablement {
                operator: true,
                data_ref: false,
                number: false,
                left_paren: false,
                right_paren: true,
            },
            LastAction::Number => ButtonEnablement {
                operator: true,
                data_ref: false,
                number: true,
                left_paren: false,
                right_paren: true,
            },
        }
    }
}

/// 派生状态：当前允许按下的按钮类别，不单独存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEnablement {
    pub operator: bool,
    pub data_ref: bool,
    pub number: bool,
    pub left_paren: bool,
    pub right_paren: bool,
}

/// 表达式构建器：按插入顺序持有 Token 序列与括号计数。
/// 一个公式构建期间，Token 序列由构建器独占；公式定稿后序列即被丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExpressionBuilder {
    tokens: Vec<Token>,
    open_count: usize,
    close_count: usize,
    last: LastAction,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, token: Token) {
        self.last = LastAction::classify(token.kind);
        tracing::debug!(text = %token.text, kind = ?token.kind, "append token");
        self.tokens.push(token);
    }

    pub fn append_operator(&mut self, op: impl Into<String>) {
        self.push(Token::new(op, TokenKind::Operator));
    }

    pub fn append_data_ref(&mut self, field: impl Into<String>) {
        self.push(Token::new(field, TokenKind::DataRef));
    }

    pub fn append_number(&mut self, number: impl Into<String>) {
        self.push(Token::new(number, TokenKind::Number));
    }

    pub fn append_left_paren(&mut self) {
        self.open_count += 1;
        self.push(Token::new("(", TokenKind::LeftParen));
    }

    pub fn append_right_paren(&mut self) {
        self.close_count += 1;
        self.push(Token::new(")", TokenKind::RightParen));
    }

    /// 当前按钮开关：类别查表与右括号结构约束取与。
    pub fn enablement(&self) -> ButtonEnablement {
        let mut enablement = self.last.class_enablement();
        enablement.right_paren = enablement.right_paren && self.close_count < self.open_count;
        enablement
    }

    /// 渲染即按追加顺序拼接各 Token 的字面文本，
    /// 结果与提交给语法校验的公式字符串完全一致。
    pub fn render(&self) -> String {
        let mut output = String::new();
        for token in &self.tokens {
            output.push_str(token.render());
        }
        output
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// 括号完全配平：close_count == open_count，而不是仅 close <= open。
    pub fn is_balanced(&self) -> bool {
        self.close_count == self.open_count
    }

    /// 保存动作的结构前提：非空、括号配平、且不能以运算符结尾。
    pub fn can_save(&self) -> bool {
        !self.tokens.is_empty() && self.is_balanced() && self.last != LastAction::Operator
    }

    /// 删除最后一个 Token 并返回它。
    ///
    /// 开关状态通过"重放"恢复：LastAction 重置为新的最后一个 Token 的
    /// 类别，等价于构建器在追加该 Token 之后原本设置的状态。因此对任意
    /// 类别，append 后紧跟 delete_last 都精确还原之前的完整状态。
    pub fn delete_last(&mut self) -> Result<Token, BuilderError> {
        let popped = self.tokens.pop().ok_or(BuilderError::EmptyExpression)?;
        match popped.kind {
            TokenKind::LeftParen => self.open_count -= 1,
            TokenKind::RightParen => self.close_count -= 1,
            _ => {}
        }
        self.last = self
            .tokens
            .last()
            .map(|token| LastAction::classify(token.kind))
            .unwrap_or(LastAction::Start);
        tracing::debug!(text = %popped.text, "delete last token");
        Ok(popped)
    }

    /// 清空到初始状态（仅数据引用/数字/左括号可作为开头）。
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.open_count = 0;
        self.close_count = 0;
        self.last = LastAction::Start;
    }
}
