//! NSM 방언 — 범용 시그니처, Snort, Suricata, Zeek

use udfbridge_core::udf::{ConversionOptions, PlatformFamily, PlatformMetadata, Warning};

use super::{Dialect, DialectCore, profile};
use crate::error::TranslatorError;
use crate::rule::RuleBody;
use crate::syntax::CommentStyle;
use crate::syntax::signature::{Signature, SignatureFlavor, SignatureSyntax};
use crate::syntax::zeek::ZeekSyntax;

const GENERIC_PATTERNS: &[&str] =
    &[r"(?s)^\s*\S+\s+\S+\s+\S+\s+\S+\s+(->|<>)\s+\S+\s+\S+\s*\("];

const SNORT_PATTERNS: &[&str] = &[
    r"^\s*(alert|log|pass|activate|dynamic|drop|reject|sdrop)\s",
    r#"\(\s*msg\s*:\s*"[^"]+"\s*;"#,
];

const SURICATA_PATTERNS: &[&str] = &[
    r"^\s*(alert|drop|pass|reject|rejectsrc|rejectdst|rejectboth)\s+(tcp|udp|ip|icmp|http|http2|dns|tls|ssh|smtp|ftp|smb|dhcp)\s+",
    r#"msg\s*:\s*"[^"]+"\s*;"#,
];

const ZEEK_PATTERNS: &[&str] = &[r"(?m)^\s*event\s+\w+\s*\(", r"NOTICE\s*\(\s*\["];

// ─── 시그니처 ──────────────────────────────────────────────────────

/// 시그니처 방언 (범용 NSM / Snort / Suricata)
#[derive(Debug, Clone)]
pub struct SignatureDialect {
    core: DialectCore,
    syntax: SignatureSyntax,
    flavor: SignatureFlavor,
}

impl SignatureDialect {
    pub fn generic() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "1.0.0",
            "1.99.0",
            &[],
            &[("regex", true), ("wildcard", false), ("correlation", false)],
            &[],
        );
        Self::build("nsm", GENERIC_PATTERNS, metadata, SignatureFlavor::Generic)
    }

    pub fn snort() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "3.0.0",
            "3.99.0",
            &["pcre"],
            &[("regex", true), ("wildcard", false), ("correlation", false)],
            &[("fast_pattern", "anchor the longest content")],
        );
        Self::build("snort", SNORT_PATTERNS, metadata, SignatureFlavor::Snort)
    }

    pub fn suricata() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "6.0.0",
            "7.99.0",
            &["pcre", "sticky-buffers"],
            &[("regex", true), ("wildcard", false), ("correlation", false)],
            &[
                ("fast_pattern", "anchor the longest content"),
                ("startswith", "prefer startswith over anchored pcre"),
            ],
        );
        Self::build("suricata", SURICATA_PATTERNS, metadata, SignatureFlavor::Suricata)
    }

    fn build(
        id: &'static str,
        patterns: &[&str],
        metadata: PlatformMetadata,
        flavor: SignatureFlavor,
    ) -> Result<Self, TranslatorError> {
        Ok(Self {
            core: DialectCore::new(id, PlatformFamily::Nsm, patterns, metadata, CommentStyle::Hash)?,
            syntax: SignatureSyntax::new()?,
            flavor,
        })
    }
}

impl Dialect for SignatureDialect {
    fn core(&self) -> &DialectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DialectCore {
        &mut self.core
    }

    fn parse(&self, text: &str) -> Result<RuleBody, String> {
        Ok(self.syntax.parse(text)?.into_body())
    }

    fn render(
        &self,
        body: &RuleBody,
        options: &ConversionOptions,
    ) -> Result<(String, Vec<Warning>), String> {
        let (signature, warnings) =
            Signature::from_body(body, self.flavor, options.optimization_level);
        Ok((signature.render(), warnings))
    }

    fn missing_fields(&self, text: &str, _body: &RuleBody) -> Vec<String> {
        let Ok(signature) = self.syntax.parse(text) else {
            return Vec::new();
        };
        let required = match self.flavor {
            SignatureFlavor::Generic => "msg",
            SignatureFlavor::Snort | SignatureFlavor::Suricata => "sid",
        };
        if signature.has_option(required) {
            Vec::new()
        } else {
            vec![required.to_owned()]
        }
    }
}

// ─── Zeek ──────────────────────────────────────────────────────────

/// Zeek 스크립트 방언
#[derive(Debug, Clone)]
pub struct ZeekDialect {
    core: DialectCore,
    syntax: ZeekSyntax,
}

impl ZeekDialect {
    pub fn new() -> Result<Self, TranslatorError> {
        let metadata = profile(
            "4.0.0",
            "6.99.0",
            &["base/frameworks/notice"],
            &[("regex", true), ("wildcard", false), ("correlation", false)],
            &[("event", "handle the narrowest protocol event")],
        );
        Ok(Self {
            core: DialectCore::new(
                "zeek",
                PlatformFamily::Nsm,
                ZEEK_PATTERNS,
                metadata,
                CommentStyle::Hash,
            )?,
            syntax: ZeekSyntax::new()?,
        })
    }
}

impl Dialect for ZeekDialect {
    fn core(&self) -> &DialectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DialectCore {
        &mut self.core
    }

    fn parse(&self, text: &str) -> Result<RuleBody, String> {
        self.syntax.parse(text)
    }

    fn render(
        &self,
        body: &RuleBody,
        _options: &ConversionOptions,
    ) -> Result<(String, Vec<Warning>), String> {
        Ok(self.syntax.render(body))
    }
}
