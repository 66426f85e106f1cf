//! SIEM 방언 — 범용 질의, Splunk SPL, QRadar AQL

use udfbridge_core::udf::{ConversionOptions, PlatformFamily, PlatformMetadata, Warning};

use super::{Dialect, DialectCore, profile};
use crate::error::TranslatorError;
use crate::rule::RuleBody;
use crate::syntax::CommentStyle;
use crate::syntax::query::{self, QueryDialect, QuerySyntax};
use crate::syntax::signature::SignatureSyntax;

/// 범용 SIEM은 시그니처 헤더 또는 비교식 하나를 요구합니다.
const GENERIC_PATTERNS: &[&str] = &[
    r"(?i)(->|<>|[\w.$@]+\s*(==|!=|=)|\b(CONTAINS|MATCHES|I?LIKE|STARTSWITH|ENDSWITH)\b)",
];

const SPLUNK_PATTERNS: &[&str] = &[r"(?i)^\s*search\b", r"[\w.$@]+\s*!?="];

const QRADAR_PATTERNS: &[&str] = &[r"(?is)^\s*SELECT\b.*\bFROM\b", r"(?i)\bWHERE\b"];

/// QRadar 최적화 수준 2 이상에서 붙이는 검색 시간 범위
const QRADAR_TIME_WINDOW: &str = "LAST 24 HOURS";

/// 질의 기반 SIEM 방언
#[derive(Debug, Clone)]
pub struct QueryPlatform {
    core: DialectCore,
    syntax: QuerySyntax,
    dialect: &'static QueryDialect,
    /// 범용 SIEM은 시그니처 입력도 받습니다.
    signatures: Option<SignatureSyntax>,
}

impl QueryPlatform {
    pub fn generic() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "1.0.0",
            "1.99.0",
            &[],
            &[("regex", true), ("wildcard", true), ("correlation", false)],
            &[],
        );
        let mut platform = Self::build(
            "siem",
            GENERIC_PATTERNS,
            metadata,
            CommentStyle::Hash,
            &query::CANONICAL,
        )?;
        platform.signatures = Some(SignatureSyntax::new()?);
        Ok(platform)
    }

    pub fn splunk() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "8.0.0",
            "9.9.0",
            &["CIM"],
            &[("regex", true), ("wildcard", true), ("correlation", true)],
            &[
                ("index", "scope searches with index and sourcetype"),
                ("tstats", "prefer tstats on accelerated data models"),
            ],
        );
        Self::build(
            "splunk",
            SPLUNK_PATTERNS,
            metadata,
            CommentStyle::Backticks,
            &query::SPLUNK,
        )
    }

    pub fn qradar() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "7.3.0",
            "7.5.99",
            &["DSM"],
            &[("regex", true), ("wildcard", true), ("correlation", false)],
            &[("time_window", "bound the scan with LAST n HOURS")],
        );
        Self::build(
            "qradar",
            QRADAR_PATTERNS,
            metadata,
            CommentStyle::Block,
            &query::QRADAR,
        )
    }

    fn build(
        id: &'static str,
        patterns: &[&str],
        metadata: PlatformMetadata,
        comments: CommentStyle,
        dialect: &'static QueryDialect,
    ) -> Result<Self, TranslatorError> {
        Ok(Self {
            core: DialectCore::new(id, PlatformFamily::Siem, patterns, metadata, comments)?,
            syntax: QuerySyntax::new()?,
            dialect,
            signatures: None,
        })
    }
}

impl Dialect for QueryPlatform {
    fn core(&self) -> &DialectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DialectCore {
        &mut self.core
    }

    fn parse(&self, text: &str) -> Result<RuleBody, String> {
        match &self.signatures {
            Some(signatures) if signatures.looks_like(text) => {
                Ok(signatures.parse(text)?.into_body())
            }
            _ => self.syntax.parse(text, self.dialect),
        }
    }

    fn render(
        &self,
        body: &RuleBody,
        options: &ConversionOptions,
    ) -> Result<(String, Vec<Warning>), String> {
        let mut content = query::render(self.dialect, body)?;
        if self.dialect.id == query::QRADAR.id
            && options.optimization_level >= 2
            && body.stages.is_empty()
        {
            content.push(' ');
            content.push_str(QRADAR_TIME_WINDOW);
        }
        Ok((content, Vec::new()))
    }

    fn carries_references(&self) -> bool {
        false
    }
}
