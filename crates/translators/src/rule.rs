//! 정규 규칙 본문 — UDF `content`의 구조
//!
//! 모든 방언 파서는 네이티브 콘텐츠를 [`RuleBody`]로 변환하고,
//! 모든 렌더러는 [`RuleBody`]에서 네이티브 콘텐츠를 생성합니다.
//! UDF에는 이 구조의 JSON 직렬화가 저장됩니다.
//!
//! 조건은 모두 AND로 결합됩니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 정규 필드 이름
pub mod fields {
    pub const SOURCE_IP: &str = "source_ip";
    pub const DESTINATION_IP: &str = "destination_ip";
    pub const SOURCE_PORT: &str = "source_port";
    pub const DESTINATION_PORT: &str = "destination_port";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PAYLOAD: &str = "payload";
    pub const HTTP_URI: &str = "http_uri";
    pub const DNS_QUERY: &str = "dns_query";
    pub const PROCESS_NAME: &str = "process_name";
    pub const COMMAND_LINE: &str = "command_line";
    pub const PARENT_PROCESS: &str = "parent_process";
    pub const HOSTNAME: &str = "hostname";
    pub const USER: &str = "user";
    pub const FILE_PATH: &str = "file_path";
    pub const EVENT_TYPE: &str = "event_type";
    pub const AGENT_ID: &str = "agent_id";

    /// 모든 정규 필드
    pub const ALL: &[&str] = &[
        SOURCE_IP,
        DESTINATION_IP,
        SOURCE_PORT,
        DESTINATION_PORT,
        TIMESTAMP,
        PAYLOAD,
        HTTP_URI,
        DNS_QUERY,
        PROCESS_NAME,
        COMMAND_LINE,
        PARENT_PROCESS,
        HOSTNAME,
        USER,
        FILE_PATH,
        EVENT_TYPE,
        AGENT_ID,
    ];

    /// 정규 필드 여부
    pub fn is_canonical(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// 정규 와일드카드 문자
pub const WILDCARD: char = '*';

/// 조건 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

impl Operator {
    /// 선택도 순위 — 낮을수록 먼저 평가하는 것이 유리합니다.
    pub fn selectivity_rank(&self) -> u8 {
        match self {
            Self::Equals | Self::NotEquals => 0,
            Self::StartsWith | Self::EndsWith => 1,
            Self::Contains => 2,
            Self::Regex => 3,
        }
    }

    /// 정규 질의 문법의 키워드
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTSWITH",
            Self::EndsWith => "ENDSWITH",
            Self::Regex => "MATCHES",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Regex => "regex",
        };
        f.write_str(name)
    }
}

/// 필드 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// 정규 필드 이름 (매핑되지 않는 필드는 원래 이름 유지)
    pub field: String,
    pub operator: Operator,
    /// 비교 값 (`Equals`의 경우 `*` 와일드카드 포함 가능)
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// 와일드카드 패턴을 연산자로 정규화합니다.
    ///
    /// `wildcard`는 방언의 와일드카드 문자입니다 (`*` 또는 `%`).
    /// - `*v*` → `Contains(v)`, `v*` → `StartsWith(v)`, `*v` → `EndsWith(v)`
    /// - 내부 와일드카드(`a*b`)는 `Equals`로 두고 정규 와일드카드로 치환합니다.
    /// - 와일드카드만 있는 값은 `Equals("*")`입니다.
    pub fn from_pattern(field: impl Into<String>, raw: &str, wildcard: char) -> Self {
        let field = field.into();
        if raw.is_empty() || raw.chars().all(|c| c == wildcard) {
            return Self::new(field, Operator::Equals, WILDCARD.to_string());
        }
        let inner = raw.trim_matches(wildcard);
        if inner.contains(wildcard) {
            let value: String = raw
                .chars()
                .map(|c| if c == wildcard { WILDCARD } else { c })
                .collect();
            return Self::new(field, Operator::Equals, value);
        }
        let operator = match (raw.starts_with(wildcard), raw.ends_with(wildcard)) {
            (true, true) => Operator::Contains,
            (true, false) => Operator::EndsWith,
            (false, true) => Operator::StartsWith,
            (false, false) => Operator::Equals,
        };
        Self::new(field, operator, inner)
    }

    /// 조건을 와일드카드 패턴으로 표현합니다 (`Regex`/`NotEquals`는 값 그대로).
    pub fn to_pattern(&self, wildcard: char) -> String {
        let swap = |s: &str| -> String {
            s.chars()
                .map(|c| if c == WILDCARD { wildcard } else { c })
                .collect()
        };
        match self.operator {
            Operator::Equals | Operator::NotEquals => swap(&self.value),
            Operator::Contains => format!("{wildcard}{}{wildcard}", self.value),
            Operator::StartsWith => format!("{}{wildcard}", self.value),
            Operator::EndsWith => format!("{wildcard}{}", self.value),
            Operator::Regex => self.value.clone(),
        }
    }

    /// 어떤 값이든 일치하는 조건인지 여부
    pub fn is_match_all(&self) -> bool {
        match self.operator {
            Operator::Equals | Operator::NotEquals => {
                !self.value.is_empty() && self.value.chars().all(|c| c == WILDCARD)
            }
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                self.value.is_empty()
            }
            Operator::Regex => matches!(self.value.as_str(), "" | ".*" | ".+" | "^.*$" | ".*?"),
        }
    }

    /// 값 내부에 와일드카드가 있는 동등 조건인지 여부
    pub fn has_inner_wildcard(&self) -> bool {
        matches!(self.operator, Operator::Equals | Operator::NotEquals)
            && self.value.contains(WILDCARD)
            && !self.is_match_all()
    }
}

/// 네트워크 시그니처 헤더
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHeader {
    pub protocol: String,
    pub source: String,
    pub source_port: String,
    /// `->` 또는 `<>`
    pub direction: String,
    pub destination: String,
    pub destination_port: String,
}

impl Default for NetworkHeader {
    fn default() -> Self {
        Self {
            protocol: "ip".to_owned(),
            source: "any".to_owned(),
            source_port: "any".to_owned(),
            direction: "->".to_owned(),
            destination: "any".to_owned(),
            destination_port: "any".to_owned(),
        }
    }
}

/// 필터 이후 파이프라인 단계 (집계, 상관 분석 등)
///
/// 원래 방언으로 되돌릴 때만 유지됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// 단계가 작성된 방언 식별자
    pub dialect: String,
    /// 원문 그대로의 단계 텍스트
    pub text: String,
}

impl Stage {
    /// 상관 분석 단계 여부 (join, transaction, 부분 검색 등)
    pub fn is_correlation(&self) -> bool {
        const KEYWORDS: &[&str] = &["join", "transaction", "append", "sequence", "correlate"];
        let lower = self.text.to_ascii_lowercase();
        lower.contains('[')
            || lower
                .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .any(|word| KEYWORDS.contains(&word))
    }
}

/// 정규 규칙 본문
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleBody {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// 이벤트 범주 (network, process, file, dns, registry)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkHeader>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
    /// 부가 메타데이터 (sid, rev, classtype 등)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, String>,
}

impl RuleBody {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// UDF `content`로 직렬화합니다.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// UDF `content`에서 역직렬화합니다.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// 선택도가 높은 조건이 먼저 오도록 안정 정렬합니다.
    pub fn prioritize_conditions(&mut self) {
        self.conditions.sort_by_key(|c| c.operator.selectivity_rank());
    }

    /// 참조 항목을 추가합니다. 같은 키가 있으면 `, `로 이어 붙입니다.
    pub fn add_reference(&mut self, key: &str, value: &str) {
        self.references
            .entry(key.to_owned())
            .and_modify(|existing| {
                if !value.is_empty() {
                    if !existing.is_empty() {
                        existing.push_str(", ");
                    }
                    existing.push_str(value);
                }
            })
            .or_insert_with(|| value.to_owned());
    }

    /// 주어진 필드의 첫 번째 동등 조건을 꺼냅니다.
    pub fn take_equality(&mut self, field: &str) -> Option<String> {
        let idx = self.conditions.iter().position(|c| {
            c.field == field && c.operator == Operator::Equals && !c.is_match_all()
        })?;
        Some(self.conditions.remove(idx).value)
    }
}
