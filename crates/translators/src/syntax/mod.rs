//! 방언 문법 파서와 렌더러
//!
//! - [`signature`]: Snort/Suricata 계열 시그니처 (`alert tcp any any -> any any (...)`)
//! - [`query`]: 검색 질의 (`search ...`, `SELECT ... WHERE ...`, `<범주> where ...`)
//! - [`zeek`]: Zeek 이벤트 핸들러 스크립트
//!
//! 주석 처리는 방언마다 다르며 [`CommentStyle`]이 담당합니다.
//! 주석은 파싱 전에 제거되고, `name:`으로 시작하는 주석은 규칙 제목으로 사용됩니다.

pub mod query;
pub mod signature;
pub mod zeek;

use regex::Regex;

/// 방언별 주석 표기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `# ...` 줄 주석 (시그니처, Zeek, 범용 SIEM)
    Hash,
    /// Splunk 인라인 주석 (세 개의 백틱으로 감쌈)
    Backticks,
    /// `/* ... */` 블록 주석 (AQL)
    Block,
    /// JSON 문서의 `_annotations` 키
    JsonKey,
}

/// 주석 제거 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stripped {
    /// 주석을 제거한 본문
    pub text: String,
    /// 추출한 주석 텍스트 (항목 단위)
    pub comments: Vec<String>,
}

impl Stripped {
    /// `name:` 주석에서 규칙 제목을 찾습니다.
    pub fn title(&self) -> Option<String> {
        self.comments.iter().find_map(|c| {
            c.strip_prefix("name:")
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
        })
    }
}

/// 주석 추출기 — 블록/백틱 주석용 정규식을 미리 컴파일해 둡니다.
#[derive(Debug, Clone)]
pub struct CommentSyntax {
    style: CommentStyle,
    span: Option<Regex>,
}

impl CommentSyntax {
    pub fn new(style: CommentStyle) -> Result<Self, regex::Error> {
        let span = match style {
            CommentStyle::Backticks => Some(Regex::new(r"(?s)```(.*?)```")?),
            CommentStyle::Block => Some(Regex::new(r"(?s)/\*(.*?)\*/")?),
            CommentStyle::Hash | CommentStyle::JsonKey => None,
        };
        Ok(Self { style, span })
    }

    pub fn style(&self) -> CommentStyle {
        self.style
    }

    /// 주석을 제거하고 주석 내용을 수집합니다.
    pub fn strip(&self, text: &str) -> Stripped {
        match (self.style, &self.span) {
            (CommentStyle::Hash, _) => {
                let mut comments = Vec::new();
                let mut kept = Vec::new();
                for line in text.lines() {
                    match line.trim_start().strip_prefix('#') {
                        Some(comment) => comments.push(comment.trim().to_owned()),
                        None => kept.push(line),
                    }
                }
                Stripped {
                    text: kept.join("\n").trim().to_owned(),
                    comments,
                }
            }
            (_, Some(span)) => {
                let comments = span
                    .captures_iter(text)
                    .filter_map(|caps| caps.get(1))
                    .flat_map(|m| m.as_str().split(['\n', ';']))
                    .map(|c| c.trim().trim_start_matches('*').trim().to_owned())
                    .filter(|c| !c.is_empty())
                    .collect();
                Stripped {
                    text: span.replace_all(text, " ").trim().to_owned(),
                    comments,
                }
            }
            _ => Stripped {
                text: text.trim().to_owned(),
                comments: Vec::new(),
            },
        }
    }

    /// 본문 뒤에 주석을 덧붙입니다. `JsonKey`는 렌더러가 직접 처리합니다.
    pub fn annotate(&self, content: &str, lines: &[String]) -> String {
        if lines.is_empty() {
            return content.to_owned();
        }
        let sanitized: Vec<String> = lines
            .iter()
            .map(|l| l.replace(['\n', ';'], ",").replace("```", "'").replace("*/", "* /"))
            .collect();
        match self.style {
            CommentStyle::Hash => {
                let comments: Vec<String> = sanitized.iter().map(|l| format!("# {l}")).collect();
                format!("{content}\n{}", comments.join("\n"))
            }
            CommentStyle::Backticks => format!("{content} ```{}```", sanitized.join("; ")),
            CommentStyle::Block => format!("{content}\n/* {} */", sanitized.join("; ")),
            CommentStyle::JsonKey => content.to_owned(),
        }
    }
}

/// 따옴표 문자열 안에 넣을 값을 이스케이프합니다.
pub(crate) fn escape_quoted(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `escape_quoted`의 역변환 — 백슬래시 뒤 문자를 그대로 취합니다.
pub(crate) fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// 따옴표 밖에서 구분자로 문자열을 나눕니다.
pub(crate) fn split_outside_quotes<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if i < start {
            continue;
        }
        if escaped {
            escaped = false;
        } else if c == '\\' && quote.is_some() {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '"' || c == '\'' {
            quote = Some(c);
        } else if text[i..].starts_with(separator) {
            parts.push(&text[start..i]);
            start = i + separator.len();
        }
    }
    parts.push(&text[start..]);
    parts
}
