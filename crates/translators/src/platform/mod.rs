//! 방언 번역기 공통 골격
//!
//! 모든 방언은 [`Dialect`]를 구현하고 [`PlatformTranslator`]로 감싸져
//! [`Translator`] trait을 제공합니다. 공통 처리는 [`DialectCore`]가 담당합니다:
//!
//! - 입력 크기 제한, 주석 제거, 구조 패턴 검사
//! - 설정 검증 규칙, 필수 필드 검사를 거친 품질 평가
//! - UDF 봉투 구성 (식별자, 감사 정보, 원본 프로필)
//! - 렌더링 전처리 (단계/메타데이터 제거, 조건 정렬)와 후처리 (주석, 버전, 출력 크기)

pub mod edr;
pub mod nsm;
pub mod siem;

use std::collections::BTreeSet;

use chrono::Utc;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use udfbridge_core::config::PlatformConfig;
use udfbridge_core::error::TranslationError;
use udfbridge_core::translator::Translator;
use udfbridge_core::udf::{
    AuditInfo, ConversionOptions, PlatformFamily, PlatformMetadata, QualityMetrics, Rendition,
    UniversalFormat, Warning,
};

use crate::codes;
use crate::error::TranslatorError;
use crate::quality::{Conformance, QualityAnalyzer};
use crate::rule::RuleBody;
use crate::syntax::{CommentStyle, CommentSyntax, Stripped};

/// UDF 감사 정보의 작성자
const CREATED_BY: &str = "udfbridge";
/// 설정이 없을 때의 콘텐츠 크기 제한
const DEFAULT_MAX_CONTENT_SIZE: usize = 1024 * 1024;

/// 방언별 문법 구현
pub trait Dialect: Send + Sync {
    fn core(&self) -> &DialectCore;

    fn core_mut(&mut self) -> &mut DialectCore;

    /// 주석이 제거된 네이티브 텍스트를 규칙 본문으로 파싱합니다.
    fn parse(&self, text: &str) -> Result<RuleBody, String>;

    /// 전처리된 규칙 본문을 네이티브 텍스트로 렌더링합니다.
    fn render(
        &self,
        body: &RuleBody,
        options: &ConversionOptions,
    ) -> Result<(String, Vec<Warning>), String>;

    /// 파싱된 규칙에서 누락된 필수 필드 목록
    fn missing_fields(&self, _text: &str, _body: &RuleBody) -> Vec<String> {
        Vec::new()
    }

    /// 참조 메타데이터(sid, rev 등)를 담을 수 있는지 여부
    fn carries_references(&self) -> bool {
        true
    }
}

/// 플랫폼 설정에서 온 방언 조정값
#[derive(Debug, Clone)]
pub struct DialectSettings {
    pub max_content_size: usize,
    /// (규칙 이름, 정규식)
    pub rules: Vec<(String, Regex)>,
    /// 배포된 플랫폼 버전 (요청에 대상 버전이 없을 때 호환성 검사에 사용)
    pub deployed_version: Option<String>,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            rules: Vec::new(),
            deployed_version: None,
        }
    }
}

impl DialectSettings {
    /// 플랫폼 설정으로부터 조정값을 만듭니다. 검증 규칙 정규식을 컴파일합니다.
    pub fn from_config(config: &PlatformConfig) -> Result<Self, TranslatorError> {
        let mut rules = Vec::with_capacity(config.validation_rules.len());
        for (name, pattern) in &config.validation_rules {
            let regex = Regex::new(pattern).map_err(|e| TranslatorError::Config {
                field: format!("validation_rules.{name}"),
                reason: e.to_string(),
            })?;
            rules.push((name.clone(), regex));
        }
        Ok(Self {
            max_content_size: config.max_content_size,
            rules,
            deployed_version: Some(config.version.clone()),
        })
    }
}

/// 방언 공통 상태 — 식별자, 구조 패턴, 필수 필드, 프로필, 설정
#[derive(Debug, Clone)]
pub struct DialectCore {
    id: &'static str,
    family: PlatformFamily,
    structure: Vec<Regex>,
    metadata: PlatformMetadata,
    settings: DialectSettings,
    analyzer: QualityAnalyzer,
    comments: CommentSyntax,
}

impl DialectCore {
    pub fn new(
        id: &'static str,
        family: PlatformFamily,
        patterns: &[&str],
        metadata: PlatformMetadata,
        comment_style: CommentStyle,
    ) -> Result<Self, TranslatorError> {
        let structure = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            family,
            structure,
            metadata,
            settings: DialectSettings::default(),
            analyzer: QualityAnalyzer::default(),
            comments: CommentSyntax::new(comment_style)?,
        })
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn family(&self) -> PlatformFamily {
        self.family
    }

    pub fn metadata(&self) -> &PlatformMetadata {
        &self.metadata
    }

    pub fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: DialectSettings) {
        self.settings = settings;
    }

    /// 크기 제한을 확인하고 주석을 제거합니다.
    fn prepare(&self, raw: &str) -> Result<Stripped, String> {
        if raw.len() > self.settings.max_content_size {
            return Err(format!(
                "content is {} bytes; limit is {}",
                raw.len(),
                self.settings.max_content_size
            ));
        }
        let stripped = self.comments.strip(raw);
        if stripped.text.is_empty() {
            return Err("content is empty after removing comments".to_owned());
        }
        Ok(stripped)
    }

    /// 일치하지 않는 구조 패턴 목록
    fn failed_patterns(&self, text: &str) -> Vec<&str> {
        self.structure
            .iter()
            .filter(|p| !p.is_match(text))
            .map(Regex::as_str)
            .collect()
    }

    /// 방언 적합성 검사 후 품질 지표를 만듭니다.
    fn assess(&self, raw: &str, text: &str, body: &RuleBody, missing: Vec<String>) -> QualityMetrics {
        let mut conformance = Conformance::new();
        for field in &missing {
            conformance.missing_field(field);
        }
        for pattern in self.failed_patterns(text) {
            conformance.syntax_violation(pattern);
        }
        for (name, rule) in &self.settings.rules {
            if !rule.is_match(raw) {
                conformance.rule_violation(name);
            }
        }
        self.analyzer.assess(body, conformance)
    }

    /// 규칙 본문을 UDF로 감쌉니다.
    fn envelope(&self, body: RuleBody, metrics: QualityMetrics) -> Result<UniversalFormat, TranslatorError> {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(body.title.as_bytes());
        let digest = hasher.finalize();
        let id = format!(
            "udf-{}",
            digest[..8].iter().map(|b| format!("{b:02x}")).collect::<String>()
        );

        let version = body
            .references
            .get("rev")
            .cloned()
            .unwrap_or_else(|| "1".to_owned());
        let mut tags = BTreeSet::from([self.id.to_owned(), self.family.as_str().to_ascii_lowercase()]);
        if let Some(event) = &body.event {
            tags.insert(event.clone());
        }
        let now = Utc::now();

        Ok(UniversalFormat {
            id,
            version: version.clone(),
            name: Some(body.title.clone()),
            description: body.references.get("classtype").cloned(),
            content: body.to_json()?,
            platform: self.family,
            platform_specific_data: self.metadata.clone(),
            metrics,
            tags,
            audit_trail: AuditInfo {
                created_at: now,
                updated_at: now,
                created_by: CREATED_BY.to_owned(),
                version,
                change_log: vec![format!("converted from {}", self.id)],
            },
        })
    }

    /// 렌더링 전처리 — 다른 방언의 단계와 담을 수 없는 메타데이터를 제거하고 조건을 정렬합니다.
    fn prepare_body(
        &self,
        body: &mut RuleBody,
        options: &ConversionOptions,
        carries_references: bool,
    ) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let before = body.stages.len();
        body.stages.retain(|s| s.dialect == self.id);
        let dropped = before - body.stages.len();
        if dropped > 0 {
            warnings.push(Warning::minor(
                codes::STAGE_DROPPED,
                format!("{dropped} pipeline stage(s) from another dialect cannot run on {}", self.id),
            ));
        }

        if !carries_references && !body.references.is_empty() {
            let keys: Vec<&str> = body.references.keys().map(String::as_str).collect();
            warnings.push(Warning::info(
                codes::METADATA_DROPPED,
                format!("{} cannot carry metadata: {}", self.id, keys.join(", ")),
            ));
            body.references.clear();
        }

        if options.optimization_level >= 1 {
            body.prioritize_conditions();
        }
        warnings
    }

    /// 대상 버전 호환성 경고
    fn version_warning(&self, options: &ConversionOptions) -> Option<Warning> {
        let version = options
            .target_version
            .as_deref()
            .or(self.settings.deployed_version.as_deref())?;
        match self.metadata.supports_version(version) {
            Ok(true) => None,
            Ok(false) => Some(Warning::minor(
                codes::VERSION_UNSUPPORTED,
                format!(
                    "{} {version} is outside the supported range {}..={}",
                    self.id, self.metadata.min_version, self.metadata.max_version
                ),
            )),
            Err(e) => Some(Warning::minor(
                codes::VERSION_UNPARSEABLE,
                format!("target version '{version}' is not a semantic version: {e}"),
            )),
        }
    }

    /// 주석으로 남길 최적화 메모
    pub fn annotations(&self, body: &RuleBody, options: &ConversionOptions) -> Vec<String> {
        let mut lines = vec![
            format!("name: {}", body.title),
            format!("optimization_level: {}", options.optimization_level),
        ];
        if options.optimization_level >= 1 && body.conditions.len() > 1 {
            lines.push("conditions ordered by selectivity".to_owned());
        }
        lines.extend(
            self.metadata
                .optimizations
                .iter()
                .map(|(k, v)| format!("{k}: {v}")),
        );
        lines
    }
}

/// [`Dialect`] 구현을 [`Translator`]로 노출하는 래퍼
#[derive(Debug, Clone)]
pub struct PlatformTranslator<D> {
    dialect: D,
}

impl<D: Dialect> PlatformTranslator<D> {
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    /// 플랫폼 설정을 적용합니다.
    pub fn configure(&mut self, config: &PlatformConfig) -> Result<(), TranslatorError> {
        let settings = DialectSettings::from_config(config)?;
        self.dialect.core_mut().set_settings(settings);
        Ok(())
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    fn core(&self) -> &DialectCore {
        self.dialect.core()
    }

    fn parse_stripped(&self, stripped: &Stripped) -> Result<RuleBody, String> {
        let mut body = self.dialect.parse(&stripped.text)?;
        if let Some(title) = stripped.title() {
            if body.title.trim().is_empty() {
                body.title = title;
            }
        }
        if body.title.trim().is_empty() {
            body.title = format!("untitled {} rule", self.core().id());
        }
        Ok(body)
    }
}

impl<D: Dialect> Translator for PlatformTranslator<D> {
    fn platform(&self) -> &str {
        self.core().id()
    }

    fn family(&self) -> PlatformFamily {
        self.core().family()
    }

    fn metadata(&self) -> &PlatformMetadata {
        self.core().metadata()
    }

    fn to_udf(&self, raw: &str) -> Result<UniversalFormat, TranslationError> {
        let core = self.core();
        let stripped = core
            .prepare(raw)
            .map_err(|reason| TranslatorError::syntax(core.id(), reason))?;
        if let Some(pattern) = core.failed_patterns(&stripped.text).first() {
            return Err(TranslatorError::syntax(
                core.id(),
                format!("content does not match required pattern '{pattern}'"),
            )
            .into());
        }
        let body = self
            .parse_stripped(&stripped)
            .map_err(|reason| TranslatorError::syntax(core.id(), reason))?;
        let missing = self.dialect.missing_fields(&stripped.text, &body);
        let metrics = core.assess(raw, &stripped.text, &body, missing);
        debug!(
            platform = core.id(),
            conditions = body.conditions.len(),
            confidence = metrics.confidence_score,
            "parsed native rule"
        );
        Ok(core.envelope(body, metrics)?)
    }

    fn from_udf(
        &self,
        udf: &UniversalFormat,
        options: &ConversionOptions,
    ) -> Result<Rendition, TranslationError> {
        let core = self.core();
        let mut body = RuleBody::from_json(&udf.content).map_err(TranslatorError::from)?;
        let mut warnings =
            core.prepare_body(&mut body, options, self.dialect.carries_references());
        warnings.extend(core.version_warning(options));

        let (content, rendered) = self
            .dialect
            .render(&body, options)
            .map_err(|reason| TranslatorError::render(core.id(), reason))?;
        warnings.extend(rendered);

        let content = if options.preserve_comments {
            core.comments.annotate(&content, &core.annotations(&body, options))
        } else {
            content
        };
        if content.len() > core.settings.max_content_size {
            return Err(TranslatorError::render(
                core.id(),
                format!(
                    "rendered content is {} bytes; limit is {}",
                    content.len(),
                    core.settings.max_content_size
                ),
            )
            .into());
        }
        Ok(Rendition { content, warnings })
    }

    fn validate_content(&self, content: &str) -> Result<QualityMetrics, TranslationError> {
        let core = self.core();
        let invalid = |reason: String| TranslationError::Validation {
            platform: core.id().to_owned(),
            reason,
        };
        let stripped = core.prepare(content).map_err(invalid)?;
        let body = self.parse_stripped(&stripped).map_err(invalid)?;
        let missing = self.dialect.missing_fields(&stripped.text, &body);
        Ok(core.assess(content, &stripped.text, &body, missing))
    }
}

/// 버전 창과 기능으로 플랫폼 프로필을 만듭니다.
pub(crate) fn profile(
    min_version: &str,
    max_version: &str,
    dependencies: &[&str],
    capabilities: &[(&str, bool)],
    optimizations: &[(&str, &str)],
) -> PlatformMetadata {
    PlatformMetadata {
        min_version: min_version.to_owned(),
        max_version: max_version.to_owned(),
        dependencies: dependencies.iter().map(|d| (*d).to_owned()).collect(),
        capabilities: capabilities
            .iter()
            .map(|(k, v)| ((*k).to_owned(), *v))
            .collect(),
        optimizations: optimizations
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
    }
}
