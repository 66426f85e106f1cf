//! 요청 핑거프린트 — 캐시와 중복 제거의 키
//!
//! 출력에 영향을 주는 모든 입력을 SHA-256으로 묶습니다.
//! 가변 길이 필드는 길이 접두어를 붙여 경계가 모호해지지 않게 합니다.

use std::fmt;

use sha2::{Digest, Sha256};

use udfbridge_core::udf::TranslationOptions;

/// 번역 요청 핑거프린트
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// 콘텐츠, 플랫폼 쌍, 출력에 영향을 주는 옵션으로 핑거프린트를 계산합니다.
    ///
    /// 플랫폼 식별자는 소문자로 정규화하며 `timeout`과 `retry_attempts`는
    /// 결과를 바꾸지 않으므로 제외합니다.
    pub fn compute(
        content: &str,
        source: &str,
        target: &str,
        options: &TranslationOptions,
    ) -> Self {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, content.as_bytes());
        write_field(&mut hasher, source.trim().to_ascii_lowercase().as_bytes());
        write_field(&mut hasher, target.trim().to_ascii_lowercase().as_bytes());
        write_optional(&mut hasher, options.source_version.as_deref());
        hasher.update([
            options.optimization_level,
            u8::from(options.preserve_comments),
            u8::from(options.strict_validation),
        ]);
        write_optional(&mut hasher, options.target_version.as_deref());
        Self(hasher.finalize().into())
    }

    /// 16진수 표현 앞 12자리 (로그용)
    pub fn short(&self) -> String {
        self.to_string()[..12].to_owned()
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn write_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1]);
            write_field(hasher, v.as_bytes());
        }
        None => hasher.update([0]),
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}
