//! EDR 방언 — 범용 JSON/EQL, CrowdStrike, SentinelOne, Microsoft Defender
//!
//! 벤더 규칙은 JSON 문서입니다. 최상위 스칼라 키는 동등 조건이며
//! 나머지 조건은 `conditions` 배열에 `{field, operator, value}`로 기록됩니다.
//!
//! ```json
//! {
//!   "name": "Encoded PowerShell",
//!   "event_simpleName": "ProcessRollup2",
//!   "ComputerName": "*",
//!   "CommandLine": "*",
//!   "conditions": [
//!     { "field": "CommandLine", "operator": "contains", "value": "-enc" }
//!   ]
//! }
//! ```
//!
//! 벤더마다 필수 키가 있으며, 규칙이 값을 정하지 않으면 `"*"`로 채웁니다.

use serde::Deserialize;
use serde_json::{Map, Value};

use udfbridge_core::udf::{ConversionOptions, PlatformFamily, PlatformMetadata, Warning};

use super::{Dialect, DialectCore, profile};
use crate::codes;
use crate::error::TranslatorError;
use crate::mapping::{self, CategoryMap, FieldMap};
use crate::rule::{Condition, NetworkHeader, Operator, RuleBody, Stage, WILDCARD, fields};
use crate::syntax::CommentStyle;
use crate::syntax::query::{self, QuerySyntax};

const GENERIC_PATTERNS: &[&str] = &[r"(?i)^\s*(\{|[A-Za-z_]\w*\s+where\b)"];

const VENDOR_PATTERNS: &[&str] = &[r"(?s)^\s*\{.*\}\s*$"];

/// 조건 외의 의미를 갖는 최상위 키
const RESERVED_KEYS: &[&str] = &[
    "name",
    "title",
    "action",
    "network",
    "conditions",
    "stages",
    "metadata",
    ANNOTATIONS_KEY,
];

const ANNOTATIONS_KEY: &str = "_annotations";

/// 벤더 JSON 문서 구성
#[derive(Debug, Clone, Copy)]
struct EdrProfile {
    fields: FieldMap,
    categories: CategoryMap,
    /// 이벤트 유형을 담는 키
    event_key: &'static str,
    /// 이벤트 키 외에 항상 출력하는 정규 필드
    required: &'static [&'static str],
}

impl EdrProfile {
    fn platform_key(&self, canonical: &str) -> String {
        self.fields.platform_or_keep(canonical)
    }

    /// 문서에 반드시 있어야 하는 키
    fn required_keys(&self) -> Vec<String> {
        std::iter::once(self.event_key.to_owned())
            .chain(self.required.iter().map(|f| self.platform_key(f)))
            .collect()
    }
}

const GENERIC: EdrProfile = EdrProfile {
    fields: mapping::IDENTITY,
    categories: mapping::GENERIC_CATEGORIES,
    event_key: fields::EVENT_TYPE,
    required: &[],
};

const CROWDSTRIKE: EdrProfile = EdrProfile {
    fields: mapping::CROWDSTRIKE,
    categories: mapping::CROWDSTRIKE_CATEGORIES,
    event_key: "event_simpleName",
    required: &[fields::HOSTNAME, fields::COMMAND_LINE],
};

const SENTINELONE: EdrProfile = EdrProfile {
    fields: mapping::SENTINELONE,
    categories: mapping::SENTINELONE_CATEGORIES,
    event_key: "eventType",
    required: &[fields::AGENT_ID, fields::COMMAND_LINE],
};

const DEFENDER: EdrProfile = EdrProfile {
    fields: mapping::DEFENDER,
    categories: mapping::DEFENDER_CATEGORIES,
    event_key: "ActionType",
    required: &[fields::HOSTNAME, fields::COMMAND_LINE],
};

#[derive(Debug, Deserialize)]
struct RawCondition {
    field: String,
    operator: Operator,
    value: Value,
}

/// 문자열/숫자/불리언 값을 문자열로
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// EDR 방언
#[derive(Debug, Clone)]
pub struct EdrDialect {
    core: DialectCore,
    profile: EdrProfile,
    /// 범용 EDR만 EQL 입력을 받습니다.
    eql: Option<QuerySyntax>,
}

impl EdrDialect {
    pub fn generic() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "1.0.0",
            "1.99.0",
            &[],
            &[("regex", true), ("wildcard", true), ("correlation", false)],
            &[],
        );
        let mut dialect = Self::build("edr", GENERIC_PATTERNS, metadata, GENERIC)?;
        dialect.eql = Some(QuerySyntax::new()?);
        Ok(dialect)
    }

    pub fn crowdstrike() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "6.0.0",
            "7.99.0",
            &["Falcon Insight"],
            &[("regex", true), ("wildcard", true), ("correlation", false)],
            &[("event_simpleName", "narrow by event_simpleName before CommandLine")],
        );
        Self::build("crowdstrike", VENDOR_PATTERNS, metadata, CROWDSTRIKE)
    }

    pub fn sentinelone() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "21.0.0",
            "23.99.0",
            &["Deep Visibility"],
            &[("regex", true), ("wildcard", true), ("correlation", true)],
            &[("agentId", "scope by agentId when known")],
        );
        Self::build("sentinelone", VENDOR_PATTERNS, metadata, SENTINELONE)
    }

    pub fn defender() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "1.0.0",
            "2.99.0",
            &["Advanced Hunting"],
            &[("regex", true), ("wildcard", true), ("correlation", true)],
            &[("ActionType", "filter on ActionType first")],
        );
        Self::build("microsoft_defender", VENDOR_PATTERNS, metadata, DEFENDER)
    }

    fn build(
        id: &'static str,
        patterns: &[&str],
        metadata: PlatformMetadata,
        profile: EdrProfile,
    ) -> Result<Self, TranslatorError> {
        Ok(Self {
            core: DialectCore::new(id, PlatformFamily::Edr, patterns, metadata, CommentStyle::JsonKey)?,
            profile,
            eql: None,
        })
    }

    fn is_json(text: &str) -> bool {
        text.trim_start().starts_with('{')
    }

    fn parse_document(&self, text: &str) -> Result<RuleBody, String> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON document: {e}"))?;
        let Value::Object(doc) = value else {
            return Err("rule document must be a JSON object".to_owned());
        };
        let profile = &self.profile;
        let text_of = |key: &str| doc.get(key).and_then(Value::as_str).map(str::to_owned);

        let mut body = RuleBody::new(text_of("name").or_else(|| text_of("title")).unwrap_or_default());
        body.action = text_of("action");

        if let Some(event) = doc.get(profile.event_key).and_then(scalar) {
            if event != WILDCARD.to_string() {
                match profile.categories.to_canonical(&event) {
                    Some(category) => body.event = Some(category.to_owned()),
                    None => body
                        .conditions
                        .push(Condition::new(fields::EVENT_TYPE, Operator::Equals, event)),
                }
            }
        }

        for (key, value) in &doc {
            if key == profile.event_key || RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Some(raw) = scalar(value) else { continue };
            let condition = Condition::from_pattern(profile.fields.canonical_or_keep(key), &raw, WILDCARD);
            if !condition.is_match_all() {
                body.conditions.push(condition);
            }
        }

        if let Some(list) = doc.get("conditions") {
            let list: Vec<RawCondition> = serde_json::from_value(list.clone())
                .map_err(|e| format!("invalid conditions: {e}"))?;
            for raw in list {
                let value = scalar(&raw.value)
                    .ok_or_else(|| format!("condition on '{}' has a non-scalar value", raw.field))?;
                body.conditions.push(Condition::new(
                    profile.fields.canonical_or_keep(&raw.field),
                    raw.operator,
                    value,
                ));
            }
        }

        if let Some(network) = doc.get("network") {
            let header: NetworkHeader = serde_json::from_value(network.clone())
                .map_err(|e| format!("invalid network header: {e}"))?;
            body.network = Some(header);
        }
        if let Some(stages) = doc.get("stages") {
            body.stages = serde_json::from_value::<Vec<Stage>>(stages.clone())
                .map_err(|e| format!("invalid stages: {e}"))?;
        }
        if let Some(Value::Object(metadata)) = doc.get("metadata") {
            for (key, value) in metadata {
                body.add_reference(key, &scalar(value).unwrap_or_else(|| value.to_string()));
            }
        }

        if body.conditions.is_empty() && body.event.is_none() {
            return Err("document has no detection conditions".to_owned());
        }
        Ok(body)
    }
}

impl Dialect for EdrDialect {
    fn core(&self) -> &DialectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DialectCore {
        &mut self.core
    }

    fn parse(&self, text: &str) -> Result<RuleBody, String> {
        match &self.eql {
            Some(eql) if !Self::is_json(text) => eql.parse(text, &query::EQL),
            _ => self.parse_document(text),
        }
    }

    fn render(
        &self,
        body: &RuleBody,
        options: &ConversionOptions,
    ) -> Result<(String, Vec<Warning>), String> {
        let profile = &self.profile;
        let mut rest = body.clone();
        let mut warnings = Vec::new();
        let mut wildcarded = Vec::new();
        let mut doc = Map::new();

        doc.insert("name".to_owned(), Value::String(rest.title.clone()));
        if let Some(action) = &rest.action {
            doc.insert("action".to_owned(), Value::String(action.clone()));
        }

        let event = rest.take_equality(fields::EVENT_TYPE).or_else(|| {
            rest.event.as_deref().map(|category| {
                profile
                    .categories
                    .to_platform(category)
                    .map_or_else(|| category.to_owned(), str::to_owned)
            })
        });
        let event = event.unwrap_or_else(|| {
            wildcarded.push(profile.event_key.to_owned());
            WILDCARD.to_string()
        });
        doc.insert(profile.event_key.to_owned(), Value::String(event));

        for field in profile.required {
            let key = profile.platform_key(field);
            let value = rest.take_equality(field).unwrap_or_else(|| {
                wildcarded.push(key.clone());
                WILDCARD.to_string()
            });
            doc.insert(key, Value::String(value));
        }
        if !wildcarded.is_empty() {
            warnings.push(Warning::info(
                codes::SCOPE_WILDCARD,
                format!("required keys set to '*': {}", wildcarded.join(", ")),
            ));
        }

        let identity = profile.fields.entries().is_empty();
        let mut unmapped = Vec::new();
        let conditions: Vec<Value> = rest
            .conditions
            .iter()
            .map(|c| {
                let field = match profile.fields.to_platform(&c.field) {
                    Some(platform) => platform.to_owned(),
                    None => {
                        if !identity && fields::is_canonical(&c.field) {
                            unmapped.push(c.field.clone());
                        }
                        c.field.clone()
                    }
                };
                serde_json::json!({ "field": field, "operator": c.operator, "value": c.value })
            })
            .collect();
        if !unmapped.is_empty() {
            unmapped.dedup();
            warnings.push(Warning::minor(
                codes::FIELD_UNMAPPED,
                format!("{} has no field for: {}", self.core.id(), unmapped.join(", ")),
            ));
        }
        if !conditions.is_empty() {
            doc.insert("conditions".to_owned(), Value::Array(conditions));
        }

        if let Some(network) = &rest.network {
            doc.insert(
                "network".to_owned(),
                serde_json::to_value(network).map_err(|e| e.to_string())?,
            );
        }
        if !rest.stages.is_empty() {
            doc.insert(
                "stages".to_owned(),
                serde_json::to_value(&rest.stages).map_err(|e| e.to_string())?,
            );
        }
        if !rest.references.is_empty() {
            let metadata = rest
                .references
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            doc.insert("metadata".to_owned(), Value::Object(metadata));
        }
        if options.preserve_comments {
            let notes = self.core.annotations(body, options);
            doc.insert(
                ANNOTATIONS_KEY.to_owned(),
                Value::Array(notes.into_iter().map(Value::String).collect()),
            );
        }

        let content = serde_json::to_string_pretty(&Value::Object(doc)).map_err(|e| e.to_string())?;
        Ok((content, warnings))
    }

    fn missing_fields(&self, text: &str, body: &RuleBody) -> Vec<String> {
        if !Self::is_json(text) {
            return if body.event.is_none() {
                vec![fields::EVENT_TYPE.to_owned()]
            } else {
                Vec::new()
            };
        }
        let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(text) else {
            return Vec::new();
        };
        self.profile
            .required_keys()
            .into_iter()
            .filter(|key| !doc.contains_key(key))
            .collect()
    }
}
