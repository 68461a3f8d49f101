// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 持久化前属性值与错误描述的最大长度
pub const MAX_VALUE_LENGTH: usize = 255;

/// 合规性结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    /// 合规
    Open,
    /// 不合规或无法判断
    #[default]
    NotOpen,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TestResult::Open => write!(f, "open"),
            TestResult::NotOpen => write!(f, "not_open"),
        }
    }
}

impl FromStr for TestResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TestResult::Open),
            "not_open" => Ok(TestResult::NotOpen),
            _ => Err(()),
        }
    }
}

/// 单条校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// 通用错误，例如校验器进程失败
    Generic { description: String },
    /// 违反了格式规范中的某条规则
    RuleViolation {
        description: String,
        specification: String,
        clause: String,
        test_number: String,
    },
}

impl ValidationError {
    pub fn generic(description: impl Into<String>) -> Self {
        ValidationError::Generic {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ValidationError::Generic { description } => description,
            ValidationError::RuleViolation { description, .. } => description,
        }
    }

    /// 持久化使用的类型标识
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Generic { .. } => "generic",
            ValidationError::RuleViolation { .. } => "rule_violation",
        }
    }
}

/// 校验结果
///
/// 每次校验尝试只产生一个结果，要么整体保存，要么因任务中止被整体丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub test_result: TestResult,
    /// 按报告顺序排列的错误
    pub errors: Vec<ValidationError>,
    /// 提取出的文档属性
    pub properties: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new(test_result: TestResult) -> Self {
        Self {
            test_result,
            ..Default::default()
        }
    }

    /// 构造问题结果：结论未知，仅包含一条通用错误
    pub fn problem(message: impl Into<String>) -> Self {
        Self {
            test_result: TestResult::NotOpen,
            errors: vec![ValidationError::generic(message)],
            properties: BTreeMap::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}

/// 按字符截断到最大持久化长度
pub fn truncate_value(value: &str) -> String {
    match value.char_indices().nth(MAX_VALUE_LENGTH) {
        Some((index, _)) => value[..index].to_string(),
        None => value.to_string(),
    }
}
