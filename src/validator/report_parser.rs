// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ValidatorSettings;
use crate::domain::models::validation_result::{
    TestResult, ValidationError, ValidationResult, MAX_VALUE_LENGTH,
};
use crate::validator::traits::ValidatorError;
use std::collections::BTreeMap;
use sxd_document::dom::Document;
use sxd_document::parser;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value, XPath};
use tracing::{debug, info};

const BASE_PATH: &str = "/report/jobs/job/";
const VALIDATION_REPORT_PATH: &str = "/report/jobs/job/validationReport/";

/// 决定 flavour 分类的两个特殊属性
pub const FLAVOUR_PART_PROPERTY: &str = "flavour_part";
pub const FLAVOUR_CONFORMANCE_PROPERTY: &str = "flavour_conformance";
/// 写入结果的组合属性名
pub const FLAVOUR_PROPERTY: &str = "flavour";

/// 可以判定为合规的 flavour part
const COMPLIANT_PARTS: [i32; 2] = [1, 2];

/// 校验报告解析器
///
/// 解析校验工具输出的 XML 报告，生成校验结果并按配置提取文档属性。
#[derive(Debug, Clone, Default)]
pub struct ReportParser {
    namespaces: BTreeMap<String, String>,
    properties: BTreeMap<String, Vec<String>>,
}

impl ReportParser {
    pub fn new(
        namespaces: BTreeMap<String, String>,
        properties: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            namespaces,
            properties,
        }
    }

    pub fn from_settings(settings: &ValidatorSettings) -> Self {
        Self::new(settings.namespaces.clone(), settings.properties.clone())
    }

    /// 解析报告内容
    ///
    /// # 参数
    ///
    /// * `xml` - 报告文件内容
    ///
    /// # 返回值
    ///
    /// * `Ok(ValidationResult)` - 解析得到的结果
    /// * `Err(ValidatorError)` - 报告无法解析或查询失败
    pub fn parse(&self, xml: &str) -> Result<ValidationResult, ValidatorError> {
        let package =
            parser::parse(xml).map_err(|e| ValidatorError::Report(format!("{:?}", e)))?;
        let document = package.as_document();
        let query = ReportQuery::new(document, &self.namespaces);

        let mut result = base_result(&query)?;
        self.evaluate_properties(&mut result, &query);
        Ok(result)
    }

    fn evaluate_properties(&self, result: &mut ValidationResult, query: &ReportQuery<'_>) {
        let part = self.property(FLAVOUR_PART_PROPERTY, query);
        // A compliant flag only stands for the parts that can be fully compliant.
        match part.trim().parse::<i32>() {
            Ok(value) if COMPLIANT_PARTS.contains(&value) => {}
            _ => result.test_result = TestResult::NotOpen,
        }

        let conformance = self
            .property(FLAVOUR_CONFORMANCE_PROPERTY, query)
            .to_uppercase();
        let flavour = format!("{}{}", part, conformance);
        if !flavour.is_empty() {
            result.add_property(FLAVOUR_PROPERTY, flavour);
        }

        for (name, queries) in &self.properties {
            if name == FLAVOUR_PART_PROPERTY || name == FLAVOUR_CONFORMANCE_PROPERTY {
                continue;
            }
            let value = preferred_value(queries, query);
            if !value.is_empty() {
                result.add_property(name.clone(), value);
            }
        }
    }

    fn property(&self, name: &str, query: &ReportQuery<'_>) -> String {
        self.properties
            .get(name)
            .map(|queries| preferred_value(queries, query))
            .unwrap_or_default()
    }
}

/// 依次尝试候选查询
///
/// 第一个长度不超过上限的非空值胜出；全部超长时保留第一个非空值。
fn preferred_value(queries: &[String], query: &ReportQuery<'_>) -> String {
    let mut fallback = String::new();
    for expression in queries {
        let value = match query.string(expression) {
            Ok(value) => value,
            Err(e) => {
                info!("Some problem in obtaining property: {}", e);
                break;
            }
        };
        if value.is_empty() {
            continue;
        }
        if value.chars().count() <= MAX_VALUE_LENGTH {
            return value;
        }
        if fallback.is_empty() {
            fallback = value;
        }
    }
    fallback
}

fn base_result(query: &ReportQuery<'_>) -> Result<ValidationResult, ValidatorError> {
    let mut result = ValidationResult::new(TestResult::NotOpen);

    let exception = query.string(&format!("{}taskResult/exceptionMessage", BASE_PATH))?;
    if !exception.is_empty() {
        result.add_error(ValidationError::generic(exception));
    }

    let compliant = query.string(&format!("{}@isCompliant", VALIDATION_REPORT_PATH))?;
    if compliant.trim().eq_ignore_ascii_case("true") {
        // Provisional; flavour evaluation may still downgrade it.
        result.test_result = TestResult::Open;
    } else {
        add_rule_violations(&mut result, query)?;
    }
    Ok(result)
}

fn add_rule_violations(
    result: &mut ValidationResult,
    query: &ReportQuery<'_>,
) -> Result<(), ValidatorError> {
    let rules = query.nodes(&format!("{}details/rule", VALIDATION_REPORT_PATH))?;
    debug!("Report contains {} rule entries", rules.len());

    for rule in rules {
        let status = query.string_at("@status", rule)?;
        if !status.eq_ignore_ascii_case("failed") {
            continue;
        }
        result.add_error(ValidationError::RuleViolation {
            description: query.string_at("description", rule)?,
            specification: query.string_at("@specification", rule)?,
            clause: query.string_at("@clause", rule)?,
            test_number: query.string_at("@testNumber", rule)?,
        });
    }
    Ok(())
}

/// 绑定文档与命名空间的查询上下文
struct ReportQuery<'d> {
    document: Document<'d>,
    context: Context<'d>,
    factory: Factory,
}

impl<'d> ReportQuery<'d> {
    fn new(document: Document<'d>, namespaces: &BTreeMap<String, String>) -> Self {
        let mut context = Context::new();
        for (prefix, uri) in namespaces {
            context.set_namespace(prefix, uri);
        }
        Self {
            document,
            context,
            factory: Factory::new(),
        }
    }

    fn compile(&self, expression: &str) -> Result<XPath, ValidatorError> {
        self.factory
            .build(expression)
            .map_err(|e| ValidatorError::Query(format!("{}: {:?}", expression, e)))?
            .ok_or_else(|| ValidatorError::Query(format!("empty expression: {}", expression)))
    }

    fn evaluate(&self, expression: &str, node: Node<'d>) -> Result<Value<'d>, ValidatorError> {
        self.compile(expression)?
            .evaluate(&self.context, node)
            .map_err(|e| ValidatorError::Query(format!("{}: {:?}", expression, e)))
    }

    fn string(&self, expression: &str) -> Result<String, ValidatorError> {
        self.string_at(expression, self.document.root().into())
    }

    fn string_at(&self, expression: &str, node: Node<'d>) -> Result<String, ValidatorError> {
        Ok(self.evaluate(expression, node)?.string())
    }

    fn nodes(&self, expression: &str) -> Result<Vec<Node<'d>>, ValidatorError> {
        match self.evaluate(expression, self.document.root().into())? {
            Value::Nodeset(nodes) => Ok(nodes.document_order()),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[path = "report_parser_test.rs"]
mod tests;
