//! 검색 질의 문법 (Splunk SPL, QRadar AQL, EQL, 정규 질의)
//!
//! 지원하는 모양:
//!
//! ```text
//! search src_ip="10.0.0.1" _raw="*evil*" | regex process="^cmd" | stats count by host
//! SELECT * FROM events WHERE sourceip = '10.0.0.1' AND payload ILIKE '%evil%' GROUP BY sourceip
//! process where process.name == "cmd.exe" and not user.name == "SYSTEM"
//! source_ip = "10.0.0.1" AND payload CONTAINS "evil"
//! ```
//!
//! 조건은 AND로만 결합됩니다. `OR`와 괄호 묶음은 파싱 에러입니다.
//! 필터 이후의 파이프 명령과 `GROUP BY` 같은 후행 절은 [`Stage`]로 보존됩니다.

use regex::Regex;

use super::{escape_quoted, split_outside_quotes};
use crate::mapping::{self, FieldMap};
use crate::rule::{Condition, Operator, RuleBody, Stage, fields};

/// 정규식 조건 표기 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexStyle {
    /// 파이프 명령 (`| regex field="expr"`)
    Pipe(&'static str),
    /// 비교 키워드 (`field MATCHES 'expr'`)
    Keyword(&'static str),
}

/// 질의 방언 정의
#[derive(Debug, Clone, Copy)]
pub struct QueryDialect {
    /// 단계(stage)에 기록되는 방언 식별자
    pub id: &'static str,
    pub fields: FieldMap,
    /// 필터 앞에 붙는 머리말
    pub prefix: &'static str,
    pub conjunction: &'static str,
    pub quote: char,
    /// 패턴 연산자의 와일드카드 문자
    pub wildcard: char,
    /// `=` 비교에서도 와일드카드를 해석하는지 여부
    pub wildcard_equality: bool,
    /// 연산자 양쪽 공백 여부
    pub spaced: bool,
    /// 패턴 비교 키워드 (`ILIKE`)
    pub like: Option<&'static str>,
    pub regex: RegexStyle,
    /// `CONTAINS`/`STARTSWITH`/`ENDSWITH` 키워드 사용 여부
    pub keyword_ops: bool,
    pub stage_separator: &'static str,
}

pub const SPLUNK: QueryDialect = QueryDialect {
    id: "splunk",
    fields: mapping::SPLUNK,
    prefix: "search ",
    conjunction: " AND ",
    quote: '"',
    wildcard: '*',
    wildcard_equality: true,
    spaced: false,
    like: None,
    regex: RegexStyle::Pipe("regex"),
    keyword_ops: false,
    stage_separator: " | ",
};

pub const QRADAR: QueryDialect = QueryDialect {
    id: "qradar",
    fields: mapping::QRADAR,
    prefix: "SELECT * FROM events WHERE ",
    conjunction: " AND ",
    quote: '\'',
    wildcard: '%',
    wildcard_equality: false,
    spaced: true,
    like: Some("ILIKE"),
    regex: RegexStyle::Keyword("MATCHES"),
    keyword_ops: false,
    stage_separator: " ",
};

/// 정규 필드 이름을 그대로 쓰는 범용 질의
pub const CANONICAL: QueryDialect = QueryDialect {
    id: "siem",
    fields: mapping::IDENTITY,
    prefix: "",
    conjunction: " AND ",
    quote: '"',
    wildcard: '*',
    wildcard_equality: true,
    spaced: true,
    like: None,
    regex: RegexStyle::Keyword("MATCHES"),
    keyword_ops: true,
    stage_separator: " | ",
};

/// EQL (범용 EDR 입력)
pub const EQL: QueryDialect = QueryDialect {
    id: "edr",
    fields: mapping::ECS,
    prefix: "",
    conjunction: " and ",
    quote: '"',
    wildcard: '*',
    wildcard_equality: true,
    spaced: true,
    like: None,
    regex: RegexStyle::Keyword("regex"),
    keyword_ops: false,
    stage_separator: " | ",
};

/// 필터 뒤에 오는 절의 첫 단어
const TRAILING_CLAUSES: &[&str] = &["group", "order", "last", "start", "stop", "limit", "having"];

// ─── 토큰 ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind<'a> {
    Word(&'a str),
    Quoted(String),
    Op(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token<'a> {
    kind: Kind<'a>,
    /// 원문에서의 바이트 위치
    start: usize,
}

fn is_op_char(c: char) -> bool {
    matches!(c, '=' | '!' | '<' | '>')
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    if ch == '\\' {
                        // 따옴표와 백슬래시만 이스케이프로 해석 (정규식 백슬래시 보존)
                        match chars.peek() {
                            Some(&(_, next)) if next == c || next == '\\' => {
                                value.push(next);
                                chars.next();
                            }
                            _ => value.push(ch),
                        }
                    } else if ch == c {
                        closed = true;
                        break;
                    } else {
                        value.push(ch);
                    }
                }
                if !closed {
                    return Err(format!("unterminated string starting at offset {start}"));
                }
                tokens.push(Token {
                    kind: Kind::Quoted(value),
                    start,
                });
            }
            '(' | ')' => {
                return Err("grouping with parentheses is not supported".to_owned());
            }
            c if is_op_char(c) => {
                chars.next();
                let mut end = start + c.len_utf8();
                if let Some(&(i, next)) = chars.peek() {
                    if next == '=' || (c == '<' && next == '>') {
                        chars.next();
                        end = i + next.len_utf8();
                    }
                }
                tokens.push(Token {
                    kind: Kind::Op(&text[start..end]),
                    start,
                });
            }
            _ => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_whitespace() || is_op_char(ch) || ch == '(' || ch == ')' {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: Kind::Word(&text[start..end]),
                    start,
                });
            }
        }
    }
    Ok(tokens)
}

fn token_text(token: Option<&Token<'_>>) -> Option<String> {
    match token.map(|t| &t.kind) {
        Some(Kind::Word(w)) => Some((*w).to_owned()),
        Some(Kind::Quoted(q)) => Some(q.clone()),
        _ => None,
    }
}

// ─── 파서 ──────────────────────────────────────────────────────────

/// 질의 파서 — 머리말 정규식을 미리 컴파일해 둡니다.
#[derive(Debug, Clone)]
pub struct QuerySyntax {
    search: Regex,
    select: Regex,
    category: Regex,
    where_kw: Regex,
}

impl QuerySyntax {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            search: Regex::new(r"(?is)^\s*search\b(.*)$")?,
            select: Regex::new(r"(?is)^\s*SELECT\b.*?\bFROM\s+\S+(.*)$")?,
            category: Regex::new(r"(?is)^\s*([A-Za-z_]\w*)\s+where\b(.*)$")?,
            where_kw: Regex::new(r"(?is)^\s*WHERE\b(.*)$")?,
        })
    }

    /// 질의를 정규 규칙 본문으로 파싱합니다.
    pub fn parse(&self, text: &str, dialect: &QueryDialect) -> Result<RuleBody, String> {
        let segments = split_outside_quotes(text, "|");
        let (first, pipes) = segments
            .split_first()
            .ok_or_else(|| "empty query".to_owned())?;

        let mut body = RuleBody::default();
        let filter = self.strip_prefix(first, &mut body);

        let tokens = tokenize(&filter)?;
        let trailing = tokens.iter().enumerate().find(|(idx, t)| {
            matches!(t.kind, Kind::Word(w) if TRAILING_CLAUSES.iter().any(|k| k.eq_ignore_ascii_case(w)))
                && !matches!(tokens.get(idx + 1).map(|n| &n.kind), Some(Kind::Op(_)))
        });
        let (terms, stage) = match trailing {
            Some((idx, token)) => (&tokens[..idx], Some(filter[token.start..].trim())),
            None => (&tokens[..], None),
        };
        parse_terms(terms, dialect, &mut body)?;
        if let Some(stage) = stage {
            body.stages.push(Stage {
                dialect: dialect.id.to_owned(),
                text: stage.to_owned(),
            });
        }

        for pipe in pipes {
            let pipe = pipe.trim();
            if pipe.is_empty() {
                return Err("empty pipeline command".to_owned());
            }
            let (command, rest) = pipe.split_once(char::is_whitespace).unwrap_or((pipe, ""));
            match command.to_ascii_lowercase().as_str() {
                "regex" => body.conditions.push(parse_regex_command(rest, dialect)?),
                "where" | "search" if body.stages.is_empty() => {
                    parse_terms(&tokenize(rest)?, dialect, &mut body)?;
                }
                _ => body.stages.push(Stage {
                    dialect: dialect.id.to_owned(),
                    text: pipe.to_owned(),
                }),
            }
        }

        if body.conditions.is_empty() {
            return Err("query has no filter conditions".to_owned());
        }
        Ok(body)
    }

    /// 방언 머리말을 제거하고, EQL 범주가 있으면 본문에 기록합니다.
    fn strip_prefix(&self, segment: &str, body: &mut RuleBody) -> String {
        if let Some(caps) = self.search.captures(segment) {
            return caps.get(1).map_or("", |m| m.as_str()).to_owned();
        }
        if let Some(caps) = self.select.captures(segment) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            return match self.where_kw.captures(rest) {
                Some(w) => w.get(1).map_or("", |m| m.as_str()).to_owned(),
                None => rest.to_owned(),
            };
        }
        if let Some(caps) = self.category.captures(segment) {
            let category = caps.get(1).map_or("", |m| m.as_str());
            body.event = Some(
                mapping::GENERIC_CATEGORIES
                    .to_canonical(category)
                    .unwrap_or(category)
                    .to_ascii_lowercase(),
            );
            return caps.get(2).map_or("", |m| m.as_str()).to_owned();
        }
        segment.to_owned()
    }
}

fn keyword_operator(word: &str) -> Option<Operator> {
    match word.to_ascii_uppercase().as_str() {
        "LIKE" | "ILIKE" => Some(Operator::Equals),
        "MATCHES" | "IMATCHES" | "REGEX" | "REGEXP" => Some(Operator::Regex),
        "CONTAINS" => Some(Operator::Contains),
        "STARTSWITH" => Some(Operator::StartsWith),
        "ENDSWITH" => Some(Operator::EndsWith),
        _ => None,
    }
}

fn parse_terms(tokens: &[Token<'_>], dialect: &QueryDialect, body: &mut RuleBody) -> Result<(), String> {
    let mut idx = 0;
    let mut negate = false;

    while idx < tokens.len() {
        match &tokens[idx].kind {
            Kind::Word(w) if w.eq_ignore_ascii_case("and") => idx += 1,
            Kind::Word(w) if w.eq_ignore_ascii_case("or") => {
                return Err("OR is not supported; split the rule into separate rules".to_owned());
            }
            Kind::Word(w) if w.eq_ignore_ascii_case("not") => {
                negate = true;
                idx += 1;
            }
            Kind::Word(field) => {
                let canonical = dialect.fields.canonical_or_keep(field);
                match tokens.get(idx + 1).map(|t| &t.kind) {
                    Some(Kind::Op(op)) => {
                        let value = token_text(tokens.get(idx + 2))
                            .ok_or_else(|| format!("missing value after '{field} {op}'"))?;
                        body.conditions
                            .push(comparison(canonical, op, &value, negate, dialect)?);
                        negate = false;
                        idx += 3;
                    }
                    Some(Kind::Word(kw)) if keyword_operator(kw).is_some() => {
                        let value = token_text(tokens.get(idx + 2))
                            .ok_or_else(|| format!("missing value after '{field} {kw}'"))?;
                        if negate {
                            return Err(format!("NOT cannot be combined with {kw}"));
                        }
                        body.conditions.push(keyword_condition(canonical, kw, &value));
                        idx += 3;
                    }
                    _ => {
                        body.conditions.push(free_text(field, negate, dialect));
                        negate = false;
                        idx += 1;
                    }
                }
            }
            Kind::Quoted(text) => {
                body.conditions.push(free_text(text, negate, dialect));
                negate = false;
                idx += 1;
            }
            Kind::Op(op) => return Err(format!("unexpected operator '{op}'")),
        }
    }
    if negate {
        return Err("dangling NOT at end of filter".to_owned());
    }
    Ok(())
}

fn comparison(
    field: String,
    op: &str,
    value: &str,
    negate: bool,
    dialect: &QueryDialect,
) -> Result<Condition, String> {
    let equal = match op {
        "=" | "==" => !negate,
        "!=" | "<>" => negate,
        other => return Err(format!("comparison '{other}' is not supported")),
    };
    if equal {
        Ok(if dialect.wildcard_equality {
            Condition::from_pattern(field, value, dialect.wildcard)
        } else {
            Condition::new(field, Operator::Equals, value)
        })
    } else {
        Ok(Condition::new(field, Operator::NotEquals, value))
    }
}

fn keyword_condition(field: String, keyword: &str, value: &str) -> Condition {
    match keyword_operator(keyword) {
        Some(Operator::Equals) => Condition::from_pattern(field, value, '%'),
        Some(operator) => Condition::new(field, operator, value),
        None => Condition::new(field, Operator::Equals, value),
    }
}

fn free_text(text: &str, negate: bool, dialect: &QueryDialect) -> Condition {
    if negate {
        return Condition::new(fields::PAYLOAD, Operator::NotEquals, text);
    }
    let w = dialect.wildcard;
    Condition::from_pattern(fields::PAYLOAD, &format!("{w}{text}{w}"), w)
}

/// `regex field="expr"` 또는 `regex "expr"`
fn parse_regex_command(rest: &str, dialect: &QueryDialect) -> Result<Condition, String> {
    let tokens = tokenize(rest)?;
    match tokens.as_slice() {
        [value] => token_text(Some(value))
            .map(|v| Condition::new(fields::PAYLOAD, Operator::Regex, v))
            .ok_or_else(|| "regex command expects an expression".to_owned()),
        [field, op, value] => {
            let (Kind::Word(field), Kind::Op(op)) = (&field.kind, &op.kind) else {
                return Err("regex command expects field=\"expr\"".to_owned());
            };
            let expr = token_text(Some(value))
                .ok_or_else(|| "regex command expects an expression".to_owned())?;
            if *op != "=" {
                return Err(format!("regex command does not support '{op}'"));
            }
            Ok(Condition::new(
                dialect.fields.canonical_or_keep(field),
                Operator::Regex,
                expr,
            ))
        }
        _ => Err("regex command expects field=\"expr\"".to_owned()),
    }
}

// ─── 렌더러 ────────────────────────────────────────────────────────

/// 정규 규칙 본문을 질의로 렌더링합니다.
///
/// 본문의 단계는 모두 출력됩니다. 다른 방언의 단계는 호출자가 미리 걸러야 합니다.
pub fn render(dialect: &QueryDialect, body: &RuleBody) -> Result<String, String> {
    if body.conditions.is_empty() {
        return Err("rule has no conditions to express as a query".to_owned());
    }

    let mut terms = Vec::new();
    let mut pipes = Vec::new();
    for condition in &body.conditions {
        let field = dialect.fields.platform_or_keep(&condition.field);
        match (condition.operator, dialect.regex) {
            (Operator::Regex, RegexStyle::Pipe(command)) => {
                pipes.push(format!("{command} {field}={}", quoted(dialect, &condition.value)));
            }
            _ => terms.push(render_term(dialect, &field, condition)),
        }
    }

    let filter = if terms.is_empty() {
        dialect.wildcard.to_string()
    } else {
        terms.join(dialect.conjunction)
    };
    let mut out = format!("{}{filter}", dialect.prefix);
    for pipe in pipes {
        out.push_str(" | ");
        out.push_str(&pipe);
    }
    for stage in &body.stages {
        out.push_str(dialect.stage_separator);
        out.push_str(&stage.text);
    }
    Ok(out)
}

fn quoted(dialect: &QueryDialect, value: &str) -> String {
    let q = dialect.quote;
    format!("{q}{}{q}", escape_quoted(value, q))
}

fn render_term(dialect: &QueryDialect, field: &str, condition: &Condition) -> String {
    let sp = if dialect.spaced { " " } else { "" };
    let value = &condition.value;
    match condition.operator {
        Operator::Equals => match dialect.like {
            Some(like) if condition.has_inner_wildcard() || condition.is_match_all() => {
                format!("{field} {like} {}", quoted(dialect, &condition.to_pattern(dialect.wildcard)))
            }
            _ => format!("{field}{sp}={sp}{}", quoted(dialect, value)),
        },
        Operator::NotEquals => format!("{field}{sp}!={sp}{}", quoted(dialect, value)),
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            if let Some(like) = dialect.like {
                format!("{field} {like} {}", quoted(dialect, &condition.to_pattern(dialect.wildcard)))
            } else if dialect.keyword_ops {
                format!("{field} {} {}", condition.operator.keyword(), quoted(dialect, value))
            } else {
                format!("{field}{sp}={sp}{}", quoted(dialect, &condition.to_pattern(dialect.wildcard)))
            }
        }
        Operator::Regex => {
            let keyword = match dialect.regex {
                RegexStyle::Keyword(k) | RegexStyle::Pipe(k) => k,
            };
            format!("{field} {keyword} {}", quoted(dialect, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax() -> QuerySyntax {
        QuerySyntax::new().unwrap()
    }

    fn shapes(body: &RuleBody) -> Vec<(String, Operator, String)> {
        body.conditions
            .iter()
            .map(|c| (c.field.clone(), c.operator, c.value.clone()))
            .collect()
    }

    #[test]
    fn parses_splunk_search_with_pipes() {
        let body = syntax()
            .parse(
                r#"search src_ip="10.0.0.1" _raw="*evil*" | regex process="^cmd\.exe" | stats count by host"#,
                &SPLUNK,
            )
            .unwrap();
        assert_eq!(
            shapes(&body),
            vec![
                (fields::SOURCE_IP.to_owned(), Operator::Equals, "10.0.0.1".to_owned()),
                (fields::PAYLOAD.to_owned(), Operator::Contains, "evil".to_owned()),
                (fields::COMMAND_LINE.to_owned(), Operator::Regex, r"^cmd\.exe".to_owned()),
            ]
        );
        assert_eq!(body.stages.len(), 1);
        assert_eq!(body.stages[0].text, "stats count by host");
        assert_eq!(body.stages[0].dialect, "splunk");
    }

    #[test]
    fn parses_qradar_select_with_group_by() {
        let body = syntax()
            .parse(
                "SELECT sourceip, COUNT(*) FROM events WHERE sourceip = '10.0.0.1' AND payload ILIKE '%evil%' GROUP BY sourceip",
                &QRADAR,
            )
            .unwrap();
        assert_eq!(
            shapes(&body),
            vec![
                (fields::SOURCE_IP.to_owned(), Operator::Equals, "10.0.0.1".to_owned()),
                (fields::PAYLOAD.to_owned(), Operator::Contains, "evil".to_owned()),
            ]
        );
        assert_eq!(body.stages[0].text, "GROUP BY sourceip");
    }

    #[test]
    fn parses_eql_category_prefix() {
        let body = syntax()
            .parse(r#"process where process.name == "cmd.exe" and not user.name == "SYSTEM""#, &EQL)
            .unwrap();
        assert_eq!(body.event.as_deref(), Some("process"));
        assert_eq!(
            shapes(&body),
            vec![
                (fields::PROCESS_NAME.to_owned(), Operator::Equals, "cmd.exe".to_owned()),
                (fields::USER.to_owned(), Operator::NotEquals, "SYSTEM".to_owned()),
            ]
        );
    }

    #[test]
    fn parses_canonical_keywords() {
        let body = syntax()
            .parse(
                r#"source_ip = "10.0.0.1" AND payload CONTAINS "evil" AND http_uri STARTSWITH "/admin" AND payload MATCHES "ev[i1]l""#,
                &CANONICAL,
            )
            .unwrap();
        let operators: Vec<Operator> = body.conditions.iter().map(|c| c.operator).collect();
        assert_eq!(
            operators,
            vec![Operator::Equals, Operator::Contains, Operator::StartsWith, Operator::Regex]
        );
    }

    #[test]
    fn free_text_becomes_payload_contains() {
        let body = syntax().parse(r#"search malicious "bad actor""#, &SPLUNK).unwrap();
        assert_eq!(
            shapes(&body),
            vec![
                (fields::PAYLOAD.to_owned(), Operator::Contains, "malicious".to_owned()),
                (fields::PAYLOAD.to_owned(), Operator::Contains, "bad actor".to_owned()),
            ]
        );
    }

    #[test]
    fn rejects_unsupported_shapes() {
        let s = syntax();
        assert!(s.parse(r#"search a="1" OR b="2""#, &SPLUNK).unwrap_err().contains("OR"));
        assert!(s.parse(r#"search (a="1")"#, &SPLUNK).unwrap_err().contains("parentheses"));
        assert!(s.parse(r#"search a="1"#, &SPLUNK).unwrap_err().contains("unterminated"));
        assert!(s.parse("search | stats count", &SPLUNK).is_err());
        assert!(s.parse("search a > 5", &SPLUNK).unwrap_err().contains("not supported"));
    }

    #[test]
    fn renders_each_dialect() {
        let mut body = RuleBody::new("t");
        body.conditions = vec![
            Condition::new(fields::SOURCE_IP, Operator::Equals, "10.0.0.1"),
            Condition::new(fields::PAYLOAD, Operator::Contains, "evil"),
            Condition::new(fields::COMMAND_LINE, Operator::Regex, "^cmd"),
        ];

        assert_eq!(
            render(&SPLUNK, &body).unwrap(),
            r#"search src_ip="10.0.0.1" AND _raw="*evil*" | regex process="^cmd""#
        );
        assert_eq!(
            render(&QRADAR, &body).unwrap(),
            "SELECT * FROM events WHERE sourceip = '10.0.0.1' AND payload ILIKE '%evil%' AND commandline MATCHES '^cmd'"
        );
        assert_eq!(
            render(&CANONICAL, &body).unwrap(),
            r#"source_ip = "10.0.0.1" AND payload CONTAINS "evil" AND command_line MATCHES "^cmd""#
        );
    }

    #[test]
    fn render_then_parse_preserves_conditions() {
        let mut body = RuleBody::new("t");
        body.conditions = vec![
            Condition::new(fields::HOSTNAME, Operator::Equals, "web*01"),
            Condition::new(fields::USER, Operator::NotEquals, "svc"),
            Condition::new(fields::FILE_PATH, Operator::EndsWith, ".ps1"),
            Condition::new(fields::PAYLOAD, Operator::Regex, r"a\d+"),
        ];
        for dialect in [SPLUNK, QRADAR, CANONICAL] {
            let rendered = render(&dialect, &body).unwrap();
            let parsed = syntax().parse(&rendered, &dialect).unwrap();
            let mut expected = shapes(&body);
            let mut actual = shapes(&parsed);
            expected.sort_by(|a, b| a.0.cmp(&b.0));
            actual.sort_by(|a, b| a.0.cmp(&b.0));
            assert_eq!(actual, expected, "dialect {}", dialect.id);
        }
    }

    #[test]
    fn render_rejects_empty_rule() {
        assert!(render(&SPLUNK, &RuleBody::new("empty")).is_err());
    }

    #[test]
    fn splunk_regex_only_rule_uses_wildcard_filter() {
        let mut body = RuleBody::new("t");
        body.conditions
            .push(Condition::new(fields::PAYLOAD, Operator::Regex, "x+"));
        assert_eq!(render(&SPLUNK, &body).unwrap(), r#"search * | regex _raw="x+""#);
    }
}
