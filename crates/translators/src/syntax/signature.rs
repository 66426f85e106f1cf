//! 네트워크 시그니처 문법 (Snort/Suricata 계열)
//!
//! ```text
//! action proto src sport -> dst dport (key:value; key:"quoted"; flag;)
//! ```
//!
//! 옵션 값은 따옴표 안에서 `\"`, `\;`, `\\` 이스케이프를 허용합니다.
//! `pcre` 값은 정규식 백슬래시를 보존하기 위해 `\"`만 해제합니다.

use regex::Regex;
use sha2::{Digest, Sha256};
use udfbridge_core::udf::Warning;

use super::{escape_quoted, unescape};
use crate::codes;
use crate::rule::{Condition, NetworkHeader, Operator, RuleBody, fields};

/// 따옴표로 감싸 렌더링하는 옵션 키
const QUOTED_KEYS: &[&str] = &["msg", "content", "uricontent", "pcre"];

/// 시그니처 옵션 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigOption {
    pub key: String,
    /// 이스케이프가 해제된 값 (플래그 옵션은 `None`)
    pub value: Option<String>,
    /// `content:!"x"` 형태의 부정
    pub negated: bool,
}

impl SigOption {
    pub fn flag(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            negated: false,
        }
    }

    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            negated: false,
        }
    }

    pub fn negated(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            negated: true,
        }
    }
}

/// 파싱된 시그니처
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub action: String,
    pub protocol: String,
    pub source: String,
    pub source_port: String,
    pub direction: String,
    pub destination: String,
    pub destination_port: String,
    pub options: Vec<SigOption>,
}

impl Signature {
    /// 첫 번째 옵션 값을 찾습니다.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .and_then(|o| o.value.as_deref())
    }

    /// 옵션 존재 여부
    pub fn has_option(&self, key: &str) -> bool {
        self.options.iter().any(|o| o.key == key)
    }

    /// 시그니처 텍스트로 렌더링합니다.
    pub fn render(&self) -> String {
        let options: Vec<String> = self.options.iter().map(render_option).collect();
        format!(
            "{} {} {} {} {} {} {} ({})",
            self.action,
            self.protocol,
            self.source,
            self.source_port,
            self.direction,
            self.destination,
            self.destination_port,
            options.join(" ")
        )
    }
}

fn render_option(option: &SigOption) -> String {
    let Some(value) = &option.value else {
        return format!("{};", option.key);
    };
    let bang = if option.negated { "!" } else { "" };
    if option.key == "pcre" {
        format!("{}:{bang}\"{}\";", option.key, value.replace('"', "\\\""))
    } else if QUOTED_KEYS.contains(&option.key.as_str()) {
        format!(
            "{}:{bang}\"{}\";",
            option.key,
            escape_quoted(value, '"').replace(';', "\\;")
        )
    } else {
        format!("{}:{bang}{};", option.key, value.replace(';', "\\;"))
    }
}

/// 시그니처 파서 — 헤더 정규식을 한 번만 컴파일합니다.
#[derive(Debug, Clone)]
pub struct SignatureSyntax {
    header: Regex,
}

impl SignatureSyntax {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(
                r"(?s)^\s*(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(->|<>)\s+(\S+)\s+(\S+)\s*\((.*)\)\s*;?\s*$",
            )?,
        })
    }

    /// 시그니처 헤더 모양인지 확인합니다.
    pub fn looks_like(&self, text: &str) -> bool {
        self.header.is_match(text)
    }

    /// 시그니처를 파싱합니다.
    pub fn parse(&self, text: &str) -> Result<Signature, String> {
        let caps = self
            .header
            .captures(text)
            .ok_or_else(|| "expected 'action proto src sport -> dst dport (options)'".to_owned())?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_owned();
        Ok(Signature {
            action: group(1),
            protocol: group(2),
            source: group(3),
            source_port: group(4),
            direction: group(5),
            destination: group(6),
            destination_port: group(7),
            options: parse_options(&group(8))?,
        })
    }
}

/// 옵션 목록을 파싱합니다.
fn parse_options(body: &str) -> Result<Vec<SigOption>, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut options = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ';') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let key_start = i;
        while i < chars.len() && chars[i] != ':' && chars[i] != ';' {
            i += 1;
        }
        let key: String = chars[key_start..i].iter().collect::<String>().trim().to_owned();
        if key.is_empty() {
            return Err(format!("empty option key at offset {key_start}"));
        }

        if i >= chars.len() || chars[i] == ';' {
            options.push(SigOption::flag(key));
            i += 1;
            continue;
        }

        // ':' 다음 값
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let negated = i < chars.len() && chars[i] == '!';
        if negated {
            i += 1;
        }

        let raw = if i < chars.len() && chars[i] == '"' {
            i += 1;
            let start = i;
            let mut escaped = false;
            while i < chars.len() {
                if escaped {
                    escaped = false;
                } else if chars[i] == '\\' {
                    escaped = true;
                } else if chars[i] == '"' {
                    break;
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(format!("unterminated quoted value for option '{key}'"));
            }
            let inner: String = chars[start..i].iter().collect();
            i += 1;
            while i < chars.len() && chars[i] != ';' {
                if !chars[i].is_whitespace() {
                    return Err(format!("unexpected text after quoted value of '{key}'"));
                }
                i += 1;
            }
            if key == "pcre" {
                inner.replace("\\\"", "\"")
            } else {
                unescape(&inner)
            }
        } else {
            let start = i;
            let mut escaped = false;
            while i < chars.len() {
                if escaped {
                    escaped = false;
                } else if chars[i] == '\\' {
                    escaped = true;
                } else if chars[i] == ';' {
                    break;
                }
                i += 1;
            }
            let inner: String = chars[start..i].iter().collect();
            inner.trim().replace("\\;", ";")
        };
        i += 1;

        options.push(SigOption {
            key,
            value: Some(raw),
            negated,
        });
    }

    Ok(options)
}

/// `pcre` 값(`/expr/flags`)에서 정규식 본문을 꺼냅니다.
pub fn pcre_body(value: &str) -> &str {
    let trimmed = value.trim();
    match (trimmed.strip_prefix('/'), trimmed.rfind('/')) {
        (Some(_), Some(end)) if end > 0 => &trimmed[1..end],
        _ => trimmed,
    }
}

/// 정규식 본문을 `pcre` 값으로 감쌉니다.
pub fn pcre_value(expr: &str) -> String {
    format!("/{}/", expr.replace('/', "\\/"))
}

// ─── RuleBody 변환 ─────────────────────────────────────────────────

/// 렌더링 대상 시그니처 방언
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFlavor {
    /// 범용 NSM — `sid`를 요구하지 않음
    Generic,
    Snort,
    /// `startswith`/`endswith` 콘텐츠 수식어 지원
    Suricata,
}

/// 의미 없이 건너뛰는 콘텐츠 수식어
const IGNORED_MODIFIERS: &[&str] = &[
    "nocase",
    "fast_pattern",
    "depth",
    "offset",
    "distance",
    "within",
    "rawbytes",
    "isdataat",
];

/// 자동 부여 `sid`의 시작 값 (로컬 규칙 범위)
const LOCAL_SID_BASE: u64 = 1_000_000;

impl Signature {
    /// 정규 규칙 본문으로 변환합니다.
    ///
    /// 헤더의 명시적 주소/포트는 조건이 되고, 변수(`$HOME_NET`)와 `any`는 헤더에 남습니다.
    pub fn into_body(self) -> RuleBody {
        let mut body = RuleBody::new(
            self.option("msg")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("untitled signature"),
        );
        body.action = Some(self.action.clone());

        let mut header = NetworkHeader {
            protocol: self.protocol.clone(),
            direction: self.direction.clone(),
            ..NetworkHeader::default()
        };
        for (slot, value, field) in [
            (&mut header.source, &self.source, fields::SOURCE_IP),
            (&mut header.source_port, &self.source_port, fields::SOURCE_PORT),
            (&mut header.destination, &self.destination, fields::DESTINATION_IP),
            (&mut header.destination_port, &self.destination_port, fields::DESTINATION_PORT),
        ] {
            if is_explicit_address(value) {
                body.conditions.push(address_condition(field, value));
            } else {
                *slot = value.clone();
            }
        }
        body.event = Some(if header.protocol.eq_ignore_ascii_case("dns") {
            "dns".to_owned()
        } else {
            "network".to_owned()
        });
        body.network = Some(header);

        let mut buffer: Option<String> = None;
        for option in self.options {
            let key = option.key.as_str();
            match (key, option.value) {
                ("msg", _) => {}
                ("content", Some(value)) => {
                    let field = buffer.clone().unwrap_or_else(|| fields::PAYLOAD.to_owned());
                    let operator = if option.negated {
                        Operator::NotEquals
                    } else {
                        Operator::Contains
                    };
                    body.conditions.push(Condition::new(field, operator, value));
                }
                ("uricontent", Some(value)) => {
                    body.conditions
                        .push(Condition::new(fields::HTTP_URI, Operator::Contains, value));
                }
                ("pcre", Some(value)) => {
                    let field = buffer.clone().unwrap_or_else(|| fields::PAYLOAD.to_owned());
                    body.conditions
                        .push(Condition::new(field, Operator::Regex, pcre_body(&value)));
                }
                ("http_uri", None) => retarget_last(&mut body, fields::HTTP_URI),
                ("dns_query", None) => retarget_last(&mut body, fields::DNS_QUERY),
                ("startswith", None) => reshape_last(&mut body, Operator::StartsWith),
                ("endswith", None) => reshape_last(&mut body, Operator::EndsWith),
                ("http.uri", None) => buffer = Some(fields::HTTP_URI.to_owned()),
                ("dns.query", None) => buffer = Some(fields::DNS_QUERY.to_owned()),
                (sticky, None) if sticky.contains('.') => buffer = Some(sticky.to_owned()),
                (modifier, _) if IGNORED_MODIFIERS.contains(&modifier) => {}
                (other, value) => body.add_reference(other, value.as_deref().unwrap_or("")),
            }
        }
        body
    }

    /// 정규 규칙 본문에서 시그니처를 만듭니다.
    ///
    /// 반환되는 경고는 근사 변환과 `sid` 자동 부여를 설명합니다.
    pub fn from_body(
        body: &RuleBody,
        flavor: SignatureFlavor,
        optimization_level: u8,
    ) -> (Self, Vec<Warning>) {
        let mut warnings = Vec::new();
        let mut header = body.network.clone().unwrap_or_default();
        let title = if body.title.trim().is_empty() {
            "untitled signature"
        } else {
            body.title.as_str()
        };

        let mut options = vec![SigOption::pair("msg", title)];
        for condition in body.conditions.iter().filter(|c| !c.is_match_all()) {
            let slot = match condition.field.as_str() {
                fields::SOURCE_IP => Some(&mut header.source),
                fields::SOURCE_PORT => Some(&mut header.source_port),
                fields::DESTINATION_IP => Some(&mut header.destination),
                fields::DESTINATION_PORT => Some(&mut header.destination_port),
                _ => None,
            };
            if let Some(slot) = slot {
                match condition.operator {
                    Operator::Equals => {
                        *slot = condition.value.clone();
                        continue;
                    }
                    Operator::NotEquals => {
                        *slot = format!("!{}", condition.value);
                        continue;
                    }
                    _ => {}
                }
            }
            push_condition(&mut options, &mut warnings, condition, flavor);
        }

        if optimization_level >= 2 {
            add_fast_pattern(&mut options);
        }

        for (key, value) in &body.references {
            if value.is_empty() {
                options.push(SigOption::flag(key.clone()));
            } else {
                options.push(SigOption::pair(key.clone(), value.clone()));
            }
        }

        if flavor != SignatureFlavor::Generic && !body.references.contains_key("sid") {
            let sid = synthesize_sid(body);
            options.push(SigOption::pair("sid", sid.to_string()));
            if !body.references.contains_key("rev") {
                options.push(SigOption::pair("rev", "1"));
            }
            warnings.push(Warning::info(
                codes::SID_ASSIGNED,
                format!("assigned sid {sid} to rule without one"),
            ));
        }

        let signature = Self {
            action: body.action.clone().unwrap_or_else(|| "alert".to_owned()),
            protocol: header.protocol,
            source: header.source,
            source_port: header.source_port,
            direction: header.direction,
            destination: header.destination,
            destination_port: header.destination_port,
            options,
        };
        (signature, warnings)
    }
}

fn is_explicit_address(value: &str) -> bool {
    let bare = value.trim_start_matches('!');
    !bare.eq_ignore_ascii_case("any") && !bare.starts_with('$') && !bare.is_empty()
}

fn address_condition(field: &str, value: &str) -> Condition {
    match value.strip_prefix('!') {
        Some(negated) => Condition::new(field, Operator::NotEquals, negated),
        None => Condition::new(field, Operator::Equals, value),
    }
}

fn retarget_last(body: &mut RuleBody, field: &str) {
    if let Some(last) = body.conditions.last_mut() {
        last.field = field.to_owned();
    }
}

fn reshape_last(body: &mut RuleBody, operator: Operator) {
    if let Some(last) = body.conditions.last_mut() {
        if last.operator == Operator::Contains {
            last.operator = operator;
        }
    }
}

fn push_condition(
    options: &mut Vec<SigOption>,
    warnings: &mut Vec<Warning>,
    condition: &Condition,
    flavor: SignatureFlavor,
) {
    let value = condition.value.clone();
    match condition.operator {
        Operator::Contains | Operator::Equals => options.push(SigOption::pair("content", value)),
        Operator::NotEquals => options.push(SigOption::negated("content", value)),
        Operator::StartsWith | Operator::EndsWith if flavor == SignatureFlavor::Suricata => {
            options.push(SigOption::pair("content", value));
            let modifier = if condition.operator == Operator::StartsWith {
                "startswith"
            } else {
                "endswith"
            };
            options.push(SigOption::flag(modifier));
        }
        Operator::StartsWith => {
            options.push(SigOption::pair(
                "pcre",
                pcre_value(&format!("^{}", regex::escape(&value))),
            ));
        }
        Operator::EndsWith => {
            options.push(SigOption::pair(
                "pcre",
                pcre_value(&format!("{}$", regex::escape(&value))),
            ));
        }
        Operator::Regex => options.push(SigOption::pair("pcre", pcre_value(&value))),
    }

    match condition.field.as_str() {
        fields::PAYLOAD => {}
        fields::HTTP_URI => options.push(SigOption::flag("http_uri")),
        fields::DNS_QUERY => options.push(SigOption::flag("dns_query")),
        other => warnings.push(Warning::minor(
            codes::FIELD_APPROXIMATED,
            format!("field '{other}' has no signature equivalent; matched as payload content"),
        )),
    }
}

/// 가장 긴 `content` 바로 뒤에 `fast_pattern`을 붙입니다.
fn add_fast_pattern(options: &mut Vec<SigOption>) {
    let longest = options
        .iter()
        .enumerate()
        .filter(|(_, o)| o.key == "content" && !o.negated)
        .max_by_key(|(idx, o)| (o.value.as_ref().map_or(0, String::len), std::cmp::Reverse(*idx)))
        .map(|(idx, _)| idx);
    if let Some(idx) = longest {
        options.insert(idx + 1, SigOption::flag("fast_pattern"));
    }
}

/// 제목과 조건으로부터 결정적인 로컬 `sid`를 만듭니다.
fn synthesize_sid(body: &RuleBody) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(body.title.as_bytes());
    for condition in &body.conditions {
        hasher.update([0u8]);
        hasher.update(condition.field.as_bytes());
        hasher.update(condition.operator.keyword().as_bytes());
        hasher.update(condition.value.as_bytes());
    }
    let digest = hasher.finalize();
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    LOCAL_SID_BASE + u64::from(prefix) % 1_000_000_000
}
