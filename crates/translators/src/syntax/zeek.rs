//! Zeek 이벤트 핸들러 스크립트
//!
//! ```text
//! event http_request(c: connection, method: string, original_URI: string, unescaped_URI: string, version: string)
//! 	{
//! 	if ( "/admin" in unescaped_URI && c$id$orig_h == 10.0.0.5 )
//! 		NOTICE([$note=Weird::Activity, $conn=c, $msg="Admin probe", $sub="sid=7"]);
//! 	}
//! ```
//!
//! 조건은 `&&`로만 결합됩니다. 처리기 이벤트는 조건 필드로부터 결정됩니다.

use regex::Regex;
use udfbridge_core::udf::Warning;

use super::{escape_quoted, split_outside_quotes, unescape};
use crate::codes;
use crate::mapping::ZEEK;
use crate::rule::{Condition, Operator, RuleBody, fields};

/// 처리기 이벤트 정의
struct Handler {
    name: &'static str,
    params: &'static str,
    /// 문자열 조건이 검사하는 인자 (없으면 주소 조건만 가능)
    subject: Option<&'static str>,
}

const HTTP_REQUEST: Handler = Handler {
    name: "http_request",
    params: "c: connection, method: string, original_URI: string, unescaped_URI: string, version: string",
    subject: Some("unescaped_URI"),
};

const DNS_REQUEST: Handler = Handler {
    name: "dns_request",
    params: "c: connection, msg: dns_msg, query: string, qtype: count, qclass: count",
    subject: Some("query"),
};

const TCP_CONTENTS: Handler = Handler {
    name: "tcp_contents",
    params: "c: connection, is_orig: bool, seq: count, contents: string",
    subject: Some("contents"),
};

const NEW_CONNECTION: Handler = Handler {
    name: "new_connection",
    params: "c: connection",
    subject: None,
};

fn is_address_field(field: &str) -> bool {
    matches!(
        field,
        fields::SOURCE_IP | fields::DESTINATION_IP | fields::SOURCE_PORT | fields::DESTINATION_PORT
    )
}

fn is_port_field(field: &str) -> bool {
    matches!(field, fields::SOURCE_PORT | fields::DESTINATION_PORT)
}

fn choose_handler(body: &RuleBody) -> &'static Handler {
    let has = |field: &str| body.conditions.iter().any(|c| c.field == field && !c.is_match_all());
    if has(fields::HTTP_URI) {
        &HTTP_REQUEST
    } else if has(fields::DNS_QUERY) {
        &DNS_REQUEST
    } else if body
        .conditions
        .iter()
        .any(|c| !is_address_field(&c.field) && !c.is_match_all())
    {
        &TCP_CONTENTS
    } else {
        &NEW_CONNECTION
    }
}

/// Zeek 패턴 리터럴 안에 넣을 정규식 (`/`를 이스케이프)
fn pattern(expr: &str) -> String {
    format!("/{}/", expr.replace('/', "\\/"))
}

/// 메타 문자가 모두 이스케이프된 정규식이면 리터럴 문자열을 돌려줍니다.
fn literal_of(expr: &str) -> Option<String> {
    const META: &str = ".+*?()|[]{}^$";
    let mut out = String::new();
    let mut chars = expr.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let next = chars.next()?;
            if next.is_ascii_alphanumeric() {
                return None;
            }
            out.push(next);
        } else if META.contains(c) {
            return None;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Zeek 스크립트 파서/렌더러 — 정규식을 미리 컴파일해 둡니다.
#[derive(Debug, Clone)]
pub struct ZeekSyntax {
    event: Regex,
    msg: Regex,
    sub: Regex,
    guard: Regex,
    contains: Regex,
    pattern_in: Regex,
    compare: Regex,
}

impl ZeekSyntax {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            event: Regex::new(r"(?m)^\s*event\s+(\w+)\s*\(")?,
            msg: Regex::new(r#"\$msg\s*=\s*"((?:[^"\\]|\\.)*)""#)?,
            sub: Regex::new(r#"\$sub\s*=\s*"((?:[^"\\]|\\.)*)""#)?,
            guard: Regex::new(r"(?s)\bif\s*\(\s*(.*?)\s*\)\s*NOTICE\b")?,
            contains: Regex::new(r#"(?s)^"((?:[^"\\]|\\.)*)"\s+in\s+(\S+)$"#)?,
            pattern_in: Regex::new(r"(?s)^/((?:[^/\\]|\\.)*)/\s+in\s+(\S+)$")?,
            compare: Regex::new(r"(?s)^(\S+)\s*(==|!=)\s*(.+)$")?,
        })
    }

    /// 스크립트를 정규 규칙 본문으로 파싱합니다.
    pub fn parse(&self, text: &str) -> Result<RuleBody, String> {
        let event = self
            .event
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
            .ok_or_else(|| "no 'event <name>(' handler found".to_owned())?;

        let title = self
            .msg
            .captures(text)
            .and_then(|c| c.get(1))
            .map_or_else(|| "untitled zeek notice".to_owned(), |m| unescape(m.as_str()));
        let mut body = RuleBody::new(title);
        body.event = Some(if event.starts_with("dns_") { "dns" } else { "network" }.to_owned());

        if let Some(sub) = self.sub.captures(text).and_then(|c| c.get(1)) {
            for pair in unescape(sub.as_str()).split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                body.add_reference(key.trim(), value.trim());
            }
        }

        let guard = self
            .guard
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| "no 'if ( ... ) NOTICE' guard found".to_owned())?;
        if guard.contains("||") {
            return Err("'||' is not supported; split the script into separate rules".to_owned());
        }

        for term in split_outside_quotes(guard, "&&") {
            let term = term.trim();
            if term.is_empty() || term == "T" {
                continue;
            }
            body.conditions.push(self.parse_term(term)?);
        }
        Ok(body)
    }

    fn parse_term(&self, term: &str) -> Result<Condition, String> {
        if let Some(caps) = self.contains.captures(term) {
            let value = caps.get(1).map_or("", |m| m.as_str());
            let expr = caps.get(2).map_or("", |m| m.as_str());
            return Ok(Condition::new(
                ZEEK.canonical_or_keep(expr),
                Operator::Contains,
                unescape(value),
            ));
        }
        if let Some(caps) = self.pattern_in.captures(term) {
            let re = caps.get(1).map_or("", |m| m.as_str()).replace("\\/", "/");
            let field = ZEEK.canonical_or_keep(caps.get(2).map_or("", |m| m.as_str()));
            let anchored = (re.strip_prefix('^'), re.strip_suffix('$'));
            let condition = match anchored {
                (Some(rest), None) => literal_of(rest).map(|v| Condition::new(&field, Operator::StartsWith, v)),
                (None, Some(rest)) => literal_of(rest).map(|v| Condition::new(&field, Operator::EndsWith, v)),
                _ => None,
            };
            return Ok(condition.unwrap_or_else(|| Condition::new(field, Operator::Regex, re)));
        }
        if let Some(caps) = self.compare.captures(term) {
            let field = ZEEK.canonical_or_keep(caps.get(1).map_or("", |m| m.as_str()));
            let operator = match caps.get(2).map(|m| m.as_str()) {
                Some("!=") => Operator::NotEquals,
                _ => Operator::Equals,
            };
            let raw = caps.get(3).map_or("", |m| m.as_str()).trim();
            let value = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
                Some(inner) => unescape(inner),
                None if is_port_field(&field) => raw.split('/').next().unwrap_or(raw).to_owned(),
                None => raw.to_owned(),
            };
            return Ok(Condition::new(field, operator, value));
        }
        Err(format!("unsupported condition '{term}'"))
    }

    /// 정규 규칙 본문을 Zeek 스크립트로 렌더링합니다.
    pub fn render(&self, body: &RuleBody) -> (String, Vec<Warning>) {
        let handler = choose_handler(body);
        let mut warnings = Vec::new();
        let transport = body
            .network
            .as_ref()
            .map(|n| n.protocol.to_ascii_lowercase())
            .filter(|p| p == "udp" || p == "tcp")
            .unwrap_or_else(|| "tcp".to_owned());

        let mut terms = Vec::new();
        for condition in body.conditions.iter().filter(|c| !c.is_match_all()) {
            let expr = match expression(handler, &condition.field) {
                Some(expr) => expr,
                None => {
                    warnings.push(Warning::minor(
                        codes::FIELD_APPROXIMATED,
                        format!(
                            "field '{}' is not available in {}; matched against {}",
                            condition.field,
                            handler.name,
                            handler.subject.unwrap_or("contents")
                        ),
                    ));
                    handler.subject.unwrap_or("contents").to_owned()
                }
            };
            terms.push(render_term(condition, &expr, &transport));
        }
        let guard = if terms.is_empty() {
            "T".to_owned()
        } else {
            terms.join(" && ")
        };

        let mut notice = format!(
            "$note=Weird::Activity, $conn=c, $msg=\"{}\"",
            escape_quoted(&body.title, '"')
        );
        if !body.references.is_empty() {
            let sub: Vec<String> = body
                .references
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.replace(';', ",")
                    } else {
                        format!("{k}={}", v.replace(';', ","))
                    }
                })
                .collect();
            notice.push_str(&format!(", $sub=\"{}\"", escape_quoted(&sub.join(";"), '"')));
        }

        let script = format!(
            "event {}({})\n\t{{\n\tif ( {guard} )\n\t\tNOTICE([{notice}]);\n\t}}",
            handler.name, handler.params
        );
        (script, warnings)
    }

}

/// 정규 필드를 처리기 안의 Zeek 표현식으로 바꿉니다.
fn expression(handler: &Handler, field: &str) -> Option<String> {
    if is_address_field(field) {
        return ZEEK.to_platform(field).map(str::to_owned);
    }
    let platform = ZEEK.to_platform(field)?;
    (handler.subject == Some(platform)).then(|| platform.to_owned())
}

fn render_term(condition: &Condition, expr: &str, transport: &str) -> String {
    let value = &condition.value;
    let literal = |v: &str| -> String {
        if is_port_field(&condition.field) {
            format!("{v}/{transport}")
        } else if is_address_field(&condition.field) {
            v.to_owned()
        } else {
            format!("\"{}\"", escape_quoted(v, '"'))
        }
    };
    match condition.operator {
        Operator::Equals if condition.has_inner_wildcard() => {
            let parts: Vec<String> = value.split('*').map(regex::escape).collect();
            format!("{} in {expr}", pattern(&format!("^{}$", parts.join(".*"))))
        }
        Operator::Equals => format!("{expr} == {}", literal(value)),
        Operator::NotEquals => format!("{expr} != {}", literal(value)),
        Operator::Contains => format!("\"{}\" in {expr}", escape_quoted(value, '"')),
        Operator::StartsWith => format!("{} in {expr}", pattern(&format!("^{}", regex::escape(value)))),
        Operator::EndsWith => format!("{} in {expr}", pattern(&format!("{}$", regex::escape(value)))),
        Operator::Regex => format!("{} in {expr}", pattern(value)),
    }
}
